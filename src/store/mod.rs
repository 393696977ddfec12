//! SQLite store gateway
//!
//! The gateway is the sole writer of persisted fixture and side rows. All
//! writes are natural-key upserts executed in one transaction per batch, so
//! repeating a batch is a no-op in effect and a killed run leaves the store
//! in a state a re-run reproduces.

pub mod gateway;
pub mod schema;

pub use gateway::StoreGateway;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying SQLite failure
    #[error("sqlite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),

    /// JSON column encoding failure
    #[error("json encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
