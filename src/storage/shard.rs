// Package storage provides the shard implementation.

use std::collections::BTreeMap;

use parking_lot::RwLock;

/// Entries of a shard, reachable only through its lock.
pub struct ShardData<K, V> {
    pub(crate) entries: Vec<(K, V)>,
}

impl<K, V> ShardData<K, V> {
    /// Number of entries held.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over the stored entries, in insertion order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Copies every entry into `acc`.
    ///
    /// Takes no lock of its own: holding a `&ShardData` already means the caller
    /// holds this shard's lock, which lets a table-wide snapshot read all shards
    /// under locks it acquired up front.
    pub(crate) fn drain_into(&self, acc: &mut BTreeMap<K, V>)
    where
        K: Ord + Clone,
        V: Clone,
    {
        for (k, v) in &self.entries {
            acc.insert(k.clone(), v.clone());
        }
    }
}

impl<K: Eq, V> ShardData<K, V> {
    fn position(&self, key: &K) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    fn find(&self, key: &K) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Shard is an independently locked slice of the table's keyspace.
///
/// Lookups scan linearly: the table spreads keys over enough shards that each
/// one stays small.
pub struct Shard<K, V> {
    pub(crate) data: RwLock<ShardData<K, V>>,
    id: usize,
}

impl<K, V> Shard<K, V> {
    /// Creates a new empty shard.
    pub fn new(id: usize) -> Self {
        Self {
            data: RwLock::new(ShardData {
                entries: Vec::new(),
            }),
            id,
        }
    }

    /// Gets the shard's index inside its table.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Gets the number of entries.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Checks if the shard is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq, V> Shard<K, V> {
    /// Returns a copy of the value stored for `key`, or `fallback` on a miss.
    pub fn lookup(&self, key: &K, fallback: V) -> V
    where
        V: Clone,
    {
        self.data.read().find(key).cloned().unwrap_or(fallback)
    }

    /// Returns a copy of the value stored for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.data.read().find(key).cloned()
    }

    /// Checks whether `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.read().position(key).is_some()
    }

    /// Sets or updates a key-value pair.
    pub fn upsert(&self, key: K, value: V) {
        let mut data = self.data.write();
        match data.position(&key) {
            Some(idx) => data.entries[idx].1 = value,
            None => data.entries.push((key, value)),
        }
    }

    /// Removes a key, doing nothing if it is absent.
    pub fn remove(&self, key: &K) {
        let mut data = self.data.write();
        if let Some(idx) = data.position(key) {
            data.entries.remove(idx);
        }
    }
}
