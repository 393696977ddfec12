//! Sync run configuration and tuning constants

/// Maximum number of physical attempts per source call.
/// 6 attempts with linear backoff rides out short rate-limit windows and
/// transient upstream errors without stalling a league for minutes.
pub const MAX_ATTEMPTS: u32 = 6;

/// Flush threshold for accumulated side rows.
/// 200 rows keeps individual store writes well under typical statement
/// limits while amortizing transaction overhead across a league.
pub const SIDE_FLUSH_THRESHOLD: usize = 200;

/// Chunk size for keyed `IN (...)` lookups against the store.
/// 900 stays safely below SQLite's default 999 bound-parameter limit.
pub const SELECT_CHUNK_SIZE: usize = 900;

/// Default trailing window within which played fixtures are re-detailed.
pub const DEFAULT_REFRESH_DAYS: i64 = 14;

/// Default number of concurrently active league pipelines.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Hard cap on league concurrency to avoid self-inflicted rate limiting.
pub const MAX_CONCURRENCY: usize = 32;

/// Default target request rate shared across all concurrent leagues.
pub const DEFAULT_QPS: f64 = 4.0;

/// Symmetric jitter applied to the inter-request interval (fraction).
pub const JITTER_FRACTION: f64 = 0.125;

/// Leagues synced when none are supplied via flags or environment.
pub const DEFAULT_LEAGUES: &[i64] = &[
    637, 638, 639, 683, 684, 864, 961, 567, 664, 665, 905, 906, 736, 737, 548, 549, 942,
];

/// Per-run tunables threaded from the CLI down to the league pipelines.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Season whose schedules are aggregated
    pub season_id: i64,
    /// Trailing refresh window in days
    pub refresh_days: i64,
    /// Concurrency bound for league pipelines
    pub concurrency: usize,
    /// Target queries per second across the whole run
    pub qps: f64,
    /// Cooldown after each league pipeline, in seconds (0 disables)
    pub cooldown_secs: u64,
    /// Attempt ceiling for the resilient transport
    pub max_attempts: u32,
    /// Side-row batch flush threshold
    pub side_flush_threshold: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            season_id: 2,
            refresh_days: DEFAULT_REFRESH_DAYS,
            concurrency: DEFAULT_CONCURRENCY,
            qps: DEFAULT_QPS,
            cooldown_secs: 0,
            max_attempts: MAX_ATTEMPTS,
            side_flush_threshold: SIDE_FLUSH_THRESHOLD,
        }
    }
}
