//! Sharded key-value table with per-shard reader/writer locks.

pub mod error;
mod lock;
pub mod shard;
pub mod table;

#[cfg(test)]
mod shard_test;

// Re-export main types
pub use error::TableError;
pub use shard::Shard;
pub use table::{Table, DEFAULT_SHARDS};
