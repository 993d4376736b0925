// Package storage implements a sharded table with per-shard reader/writer locks.

use std::collections::hash_map::RandomState;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::num::NonZeroUsize;
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::config::{Config, ConfigTrait};

use super::error::TableError;
use super::lock::{self, AllShardsGuard};
use super::shard::Shard;

/// Number of shards used when none is configured.
pub const DEFAULT_SHARDS: usize = 19;

const DEFAULT_SHARD_COUNT: NonZeroUsize = match NonZeroUsize::new(DEFAULT_SHARDS) {
    Some(n) => n,
    None => panic!("DEFAULT_SHARDS must be positive"),
};

/// Table is a concurrent map split into a fixed number of shards.
///
/// Every key is routed to `shards[hash(key) % shard_count]`, and each shard has
/// its own reader/writer lock: operations on keys living in different shards
/// never contend. The shard count is chosen at construction and never changes.
///
/// Values are always handed out as owned copies, never as references into the
/// table. The table is not `Clone`; share it across threads by reference or
/// through an `Arc`.
pub struct Table<K, V, S = RandomState> {
    shards: Box<[Shard<K, V>]>,
    hasher: S,
}

impl<K, V> Table<K, V, RandomState> {
    /// Creates a table with `shard_count` shards and the default hasher.
    pub fn new(shard_count: usize) -> Result<Self, TableError> {
        Self::with_hasher(shard_count, RandomState::new())
    }

    /// Creates a table sized from the `table` section of the configuration.
    pub fn from_config(cfg: &Config) -> Result<Self, TableError> {
        Self::new(cfg.table().shards())
    }
}

impl<K, V> Default for Table<K, V, RandomState> {
    fn default() -> Self {
        Self::build(DEFAULT_SHARD_COUNT, RandomState::new())
    }
}

impl<K, V, S> Table<K, V, S> {
    /// Creates a table with `shard_count` shards, routing keys with `hasher`.
    ///
    /// The hasher must produce the same hash for the same key for the whole
    /// lifetime of the table.
    pub fn with_hasher(shard_count: usize, hasher: S) -> Result<Self, TableError> {
        let Some(shard_count) = NonZeroUsize::new(shard_count) else {
            warn!(
                component = "table",
                event = "construction_rejected",
                "table requires at least one shard"
            );
            return Err(TableError::ZeroShards);
        };
        Ok(Self::build(shard_count, hasher))
    }

    fn build(shard_count: NonZeroUsize, hasher: S) -> Self {
        let shards = (0..shard_count.get()).map(Shard::new).collect();
        debug!(
            component = "table",
            event = "created",
            shards = shard_count.get(),
            "table created"
        );
        Self { shards, hasher }
    }

    /// Gets the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Gets the hasher used for routing.
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Gets the number of entries.
    ///
    /// Shards are counted one after the other, so under concurrent mutation the
    /// result is an estimate. Use `snapshot` for an exact view.
    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    /// Checks if the table holds no entry.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(Shard::is_empty)
    }

    pub(crate) fn shards(&self) -> &[Shard<K, V>] {
        &self.shards
    }

    /// Locks every shard for writing, in ascending index order.
    pub(crate) fn lock_all(&self) -> AllShardsGuard<'_, K, V> {
        lock::lock_all(&self.shards)
    }
}

impl<K, V, S> Table<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Gets the index of the shard `key` is routed to.
    pub fn shard_index(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) % self.shards.len() as u64) as usize
    }

    fn shard(&self, key: &K) -> &Shard<K, V> {
        &self.shards[self.shard_index(key)]
    }

    /// Returns a copy of the value stored for `key`, or `fallback` on a miss.
    ///
    /// A miss is not an error. Use `get` to tell an absent key apart from a
    /// stored value equal to the fallback.
    pub fn lookup(&self, key: &K, fallback: V) -> V
    where
        V: Clone,
    {
        self.shard(key).lookup(key, fallback)
    }

    /// Returns a copy of the value stored for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.shard(key).get(key)
    }

    /// Checks whether `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.shard(key).contains_key(key)
    }

    /// Inserts `value` for `key`, replacing any previous value.
    pub fn upsert(&self, key: K, value: V) {
        self.shard(&key).upsert(key, value);
    }

    /// Removes `key`. Removing an absent key is a no-op.
    pub fn remove(&self, key: &K) {
        self.shard(key).remove(key);
    }

    /// Takes a point-in-time copy of the whole table, ordered by key.
    ///
    /// Every shard is write-locked, in ascending index order, before any entry
    /// is read, so writers on any shard wait until the copy is complete. The
    /// result never mixes states from before and after a concurrent write.
    pub fn snapshot(&self) -> BTreeMap<K, V>
    where
        K: Ord + Clone,
        V: Clone,
    {
        let started = Instant::now();
        let guard = self.lock_all();
        let result = guard.to_map();
        drop(guard);

        trace!(
            component = "table",
            event = "snapshot",
            shards = self.shards.len(),
            entries = result.len(),
            elapsed = ?started.elapsed(),
            "snapshot taken"
        );
        result
    }
}

impl<K, V, S> fmt::Debug for Table<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("shards", &self.shards.len())
            .field("len", &self.len())
            .finish()
    }
}
