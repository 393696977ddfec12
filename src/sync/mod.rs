//! Reconciliation and run orchestration
//!
//! The sync workflow per league:
//!
//! 1. **Discover**: list the league's clubs (with fallback chain)
//! 2. **Aggregate**: union every club's schedule, deduplicated by fixture
//! 3. **Upsert Core**: write fixture rows keyed by fixture id
//! 4. **Reconcile**: compute the minimal detail-fetch target set
//! 5. **Detail Fetch**: pull tactics per target fixture
//! 6. **Upsert Sides**: write side rows in bounded batches
//!
//! [`coordinator::RunCoordinator`] runs league pipelines concurrently under
//! a counting admission gate and isolates per-league failures.

pub mod coordinator;
pub mod league;
pub mod reconcile;

pub use coordinator::{RunCoordinator, RunReport};
pub use league::{LeaguePipeline, LeagueSummary};

use crate::source::SourceError;
use crate::store::StoreError;

/// Sync errors: anything that terminates one league's run
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Source error
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
