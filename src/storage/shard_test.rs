//! Tests for shard operations.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::super::shard::Shard;

    #[test]
    fn test_lookup_miss_returns_fallback() {
        let shard: Shard<i32, String> = Shard::new(0);
        assert_eq!(shard.lookup(&1, "x".to_string()), "x");
        assert!(shard.get(&1).is_none());
        assert!(shard.is_empty());
    }

    #[test]
    fn test_upsert_inserts_then_replaces() {
        let shard: Shard<i32, String> = Shard::new(3);
        assert_eq!(shard.id(), 3);

        shard.upsert(1, "hello".to_string());
        assert_eq!(shard.lookup(&1, "x".to_string()), "hello");
        assert_eq!(shard.len(), 1);

        shard.upsert(1, "again".to_string());
        assert_eq!(shard.get(&1).as_deref(), Some("again"));
        assert_eq!(shard.len(), 1, "updating must not duplicate the key");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let shard: Shard<i32, i32> = Shard::new(0);
        shard.upsert(1, 10);
        shard.upsert(2, 20);

        shard.remove(&1);
        assert!(!shard.contains_key(&1));
        assert_eq!(shard.len(), 1);

        shard.remove(&1);
        assert_eq!(shard.len(), 1);
        assert_eq!(shard.get(&2), Some(20));
    }

    #[test]
    fn test_remove_keeps_insertion_order() {
        let shard: Shard<i32, i32> = Shard::new(0);
        for k in 0..5 {
            shard.upsert(k, k * 10);
        }
        shard.remove(&1);

        let data = shard.data.read();
        let keys: Vec<i32> = data.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_lookup_returns_independent_copy() {
        let shard: Shard<i32, Vec<u8>> = Shard::new(0);
        shard.upsert(1, vec![1, 2, 3]);

        let mut copy = shard.lookup(&1, Vec::new());
        copy.push(4);

        assert_eq!(shard.get(&1), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_drain_into_copies_under_held_lock() {
        let shard: Shard<i32, &str> = Shard::new(0);
        shard.upsert(2, "b");
        shard.upsert(1, "a");

        let mut acc = BTreeMap::new();
        {
            let guard = shard.data.write();
            guard.drain_into(&mut acc);
        }

        assert_eq!(acc.into_iter().collect::<Vec<_>>(), vec![(1, "a"), (2, "b")]);
        // Draining copies, it does not empty the shard.
        assert_eq!(shard.len(), 2);
    }

    #[test]
    fn test_concurrent_readers_share_the_lock() {
        let shard: Shard<i32, i32> = Shard::new(0);
        shard.upsert(1, 1);

        let first = shard.data.read();
        // A second reader gets in while the first one is still held.
        assert!(shard.data.try_read().is_some());
        assert!(shard.data.try_write().is_none());
        drop(first);
        assert!(shard.data.try_write().is_some());
    }

    fn ensure_send<T: Send>() {}
    fn ensure_sync<T: Sync>() {}

    #[test]
    fn test_shard_send_sync() {
        ensure_send::<Shard<String, String>>();
        ensure_sync::<Shard<String, String>>();
    }
}
