//! Multi-shard lock acquisition.
//
// Every operation that needs more than one shard lock goes through `lock_all`,
// so that all of them take the locks in the same (ascending index) order.

use std::collections::BTreeMap;

use parking_lot::RwLockWriteGuard;

use super::shard::{Shard, ShardData};

/// Write guards over every shard of a table.
///
/// All locks are released together when the guard is dropped.
pub(crate) struct AllShardsGuard<'a, K, V> {
    guards: Vec<RwLockWriteGuard<'a, ShardData<K, V>>>,
}

/// Acquires the write lock of every shard, in ascending shard index order.
///
/// No entry is read before the last lock is held.
pub(crate) fn lock_all<K, V>(shards: &[Shard<K, V>]) -> AllShardsGuard<'_, K, V> {
    let mut guards = Vec::with_capacity(shards.len());
    for shard in shards {
        debug_assert_eq!(shard.id(), guards.len(), "shards must be locked in index order");
        guards.push(shard.data.write());
    }
    AllShardsGuard { guards }
}

impl<'a, K, V> AllShardsGuard<'a, K, V> {
    /// Number of shards held.
    pub(crate) fn shard_count(&self) -> usize {
        self.guards.len()
    }

    /// Total number of entries across all held shards.
    pub(crate) fn len(&self) -> usize {
        self.guards.iter().map(|g| g.len()).sum()
    }

    /// Iterates over `(shard index, shard data)` pairs.
    pub(crate) fn shards(&self) -> impl Iterator<Item = (usize, &ShardData<K, V>)> {
        self.guards.iter().enumerate().map(|(idx, g)| (idx, &**g))
    }

    /// Copies every entry of every shard into an ordered map.
    pub(crate) fn to_map(&self) -> BTreeMap<K, V>
    where
        K: Ord + Clone,
        V: Clone,
    {
        let mut acc = BTreeMap::new();
        for (_, data) in self.shards() {
            // Keys never span two shards, so nothing gets overwritten here.
            data.drain_into(&mut acc);
        }
        acc
    }
}
