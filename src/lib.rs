//! # Tactics Sync Library
//!
//! Incremental synchronization of match fixtures and post-match tactics from
//! the Soccerverse API into a local SQLite store.
//!
//! ## Features
//!
//! - **Incremental**: only fixtures that are new, recently played, or missing
//!   side detail are fetched in full
//! - **Rate Limited**: a single shared request gate paces all outbound calls
//! - **Resilient**: bounded retries with backoff and dedicated 429 handling
//! - **Idempotent**: all writes are natural-key upserts, so interrupted runs
//!   can simply be re-run
//!
//! ## Architecture
//!
//! The library is organized into several core modules:
//!
//! - [`source`] - Rate limiter, resilient transport and the typed API client
//! - [`store`] - SQLite store gateway with batched upserts and keyed selects
//! - [`sync`] - Reconciler, per-league pipeline and the run coordinator
//! - [`config`] - Run configuration and tuning constants
//! - [`cli`] - Command-line interface
//!
//! ## Data Model
//!
//! Two persisted row types, both keyed by natural identifiers:
//!
//! - [`Fixture`] - one scheduled match, keyed by fixture id
//! - [`SideRow`] - one club's tactics record within a fixture, keyed by
//!   (fixture id, [`Side`])

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Run configuration and tuning constants
pub mod config;

/// Source API access: rate limiting, transport, typed client
pub mod source;

/// SQLite store gateway
pub mod store;

/// Reconciliation and run orchestration
pub mod sync;

/// Core fixture record, one row per scheduled match.
///
/// Club ids and goal counts default to zero when the upstream schedule omits
/// them; negative values are clamped to zero at the decode boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fixture {
    /// Globally unique fixture id
    pub fixture_id: i64,
    /// League the fixture belongs to
    pub league_id: i64,
    /// Season the fixture belongs to
    pub season_id: i64,
    /// Scheduled kickoff (Unix timestamp in seconds)
    pub kickoff_at: i64,
    /// Home club id
    pub home_club: i64,
    /// Away club id
    pub away_club: i64,
    /// Goals scored by the home club
    pub home_goals: i64,
    /// Goals scored by the away club
    pub away_goals: i64,
    /// Whether the fixture has been played
    pub played: bool,
}

/// Which side of a fixture a club played on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The home side
    Home,
    /// The away side
    Away,
}

impl Side {
    /// Storage representation ("home" / "away")
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    /// Parses case-insensitively; side labels are normalized before storage.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "home" => Ok(Side::Home),
            "away" => Ok(Side::Away),
            _ => Err(format!("invalid side: {s}")),
        }
    }
}

/// One club's tactics record within a fixture.
///
/// Score fields are mirrored from the fixture, oriented to this side. The
/// tactics history is stored opaquely; only the first action's formation,
/// lineup and play style are lifted into columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SideRow {
    /// Fixture this record belongs to
    pub fixture_id: i64,
    /// Home or away
    pub side: Side,
    /// Club that played this side
    pub club_id: i64,
    /// The opposing club
    pub opponent_club_id: i64,
    /// Goals scored by this side
    pub goals_for: i64,
    /// Goals conceded by this side
    pub goals_against: i64,
    /// Formation id from the first tactics action, if present
    pub formation_id: Option<i64>,
    /// Play style from the first tactics action, if present
    pub play_style: Option<String>,
    /// Starting lineup (ordered player references)
    pub lineup: Vec<serde_json::Value>,
    /// Full raw tactics-action history, stored opaquely
    pub tactics_history: Vec<serde_json::Value>,
}
