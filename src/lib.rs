//! Thread-safe sharded lookup table.
//!
//! A `Table` splits its keyspace over a fixed number of shards, each guarded by
//! its own reader/writer lock, so that threads working on different shards never
//! contend. Lookups hand out owned copies of values, and `snapshot` returns a
//! consistent point-in-time copy of the whole table.
//!
//! ```
//! use shardtable::Table;
//!
//! let table: Table<i32, String> = Table::new(19).unwrap();
//! table.upsert(1, "hello".to_string());
//! table.upsert(2, "world".to_string());
//!
//! assert_eq!(table.lookup(&1, "x".to_string()), "hello");
//! assert_eq!(table.lookup(&3, "x".to_string()), "x");
//!
//! table.remove(&1);
//! assert_eq!(table.snapshot().into_iter().collect::<Vec<_>>(), vec![(2, "world".to_string())]);
//! ```

pub mod config;
pub mod storage;
pub mod workload;

pub use storage::{Shard, Table, TableError, DEFAULT_SHARDS};
