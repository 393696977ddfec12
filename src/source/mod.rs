//! Source API access
//!
//! Everything that talks to the remote simulation API lives here:
//!
//! 1. **Rate Limiting**: a single shared gate via [`rate_limit::RateLimiter`]
//! 2. **Transport**: bounded retries with backoff via [`transport::Transport`]
//! 3. **Typed Client**: normalized operations via [`client::SourceClient`]
//! 4. **Decoding**: tolerant response-shape handling in [`decode`]
//!
//! The rest of the pipeline consumes the [`FixtureSource`] trait and never
//! sees raw response shapes.

use crate::Fixture;
use async_trait::async_trait;
use serde_json::Value;

pub mod client;
pub mod decode;
pub mod rate_limit;
pub mod transport;

pub use client::{Endpoints, SourceClient};
pub use rate_limit::RateLimiter;
pub use transport::{default_http_client, SourceRequest, Transport};

/// Source access errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// All transport attempts for one operation were exhausted
    #[error("{tag} failed after retries: {last}")]
    TransportExhausted {
        /// Operation tag (RPC method or endpoint name)
        tag: String,
        /// The last error observed before giving up
        last: String,
    },

    /// Response body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Raw per-club tactics-history record for one fixture.
#[derive(Debug, Clone)]
pub struct ClubTactics {
    /// Club the record belongs to
    pub club_id: i64,
    /// Ordered raw tactics-action snapshots, kept opaque
    pub tactic_actions: Vec<Value>,
}

/// Typed operations over the remote source.
///
/// The league pipeline depends on this trait rather than the concrete HTTP
/// client so it can be driven against a scripted source in tests.
#[async_trait]
pub trait FixtureSource: Send + Sync {
    /// List the club ids of a league, deduplicated and sorted.
    ///
    /// Tries each discovery strategy in a fixed priority order; a strategy
    /// that fails or returns nothing is treated as empty and the next one is
    /// tried. All strategies failing yields an empty list, not an error;
    /// the caller treats that as "no data".
    async fn list_league_clubs(&self, league_id: i64) -> Vec<i64>;

    /// Fetch a club's scheduled fixtures for one season as core rows.
    ///
    /// Order is whatever the source returns; callers must not rely on it.
    async fn list_club_schedule(
        &self,
        club_id: i64,
        league_id: i64,
        season_id: i64,
    ) -> SourceResult<Vec<Fixture>>;

    /// Fetch a single fixture's core record by id.
    ///
    /// Used only as a fallback when schedule aggregation did not already
    /// supply the record.
    async fn fetch_fixture_core(
        &self,
        fixture_id: i64,
        league_id: i64,
        season_id: i64,
    ) -> SourceResult<Option<Fixture>>;

    /// Fetch the per-club tactics history of a fixture.
    async fn fetch_tactics(&self, fixture_id: i64) -> SourceResult<Vec<ClubTactics>>;
}
