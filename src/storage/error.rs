// Errors surfaced by table construction.

/// Errors returned when building a `Table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// A table needs at least one shard to route keys into.
    #[error("shard count must be positive, got 0")]
    ZeroShards,
}
