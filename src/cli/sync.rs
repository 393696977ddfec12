//! `sync` command: run the incremental sync over a set of leagues

use crate::cli::CliError;
use crate::config::{
    SyncConfig, DEFAULT_CONCURRENCY, DEFAULT_LEAGUES, DEFAULT_QPS, DEFAULT_REFRESH_DAYS,
    JITTER_FRACTION, MAX_CONCURRENCY,
};
use crate::source::{default_http_client, Endpoints, RateLimiter, SourceClient, Transport};
use crate::store::StoreGateway;
use crate::sync::RunCoordinator;
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Incremental fixture and tactics sync
#[derive(Parser)]
#[command(name = "tactics-sync", version, about)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Sync fixtures and per-side tactics for a set of leagues
    Sync(SyncArgs),
}

/// Arguments for the `sync` command
#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// Season whose schedules are synced
    #[arg(long, env = "SEASON_ID", default_value_t = 2)]
    pub season: i64,

    /// League id to sync (repeatable)
    #[arg(long = "league", value_name = "ID")]
    pub league: Vec<i64>,

    /// Comma-separated league ids
    #[arg(long = "leagues", value_name = "CSV")]
    pub leagues: Option<String>,

    /// File with one league id per line ('#' starts a comment)
    #[arg(long = "leagues-file", value_name = "PATH")]
    pub leagues_file: Option<PathBuf>,

    /// Concurrent league pipelines (1..=32)
    #[arg(long, env = "PAR", default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
    pub par: usize,

    /// Trailing window, in days, within which played fixtures are re-detailed
    #[arg(long = "refresh-days", env = "REFRESH_DAYS", default_value_t = DEFAULT_REFRESH_DAYS)]
    pub refresh_days: i64,

    /// Target request rate shared across the whole run
    #[arg(long, default_value_t = DEFAULT_QPS)]
    pub qps: f64,

    /// Cooldown between league pipelines on the same slot, in seconds
    #[arg(long = "cooldown-secs", default_value_t = 0)]
    pub cooldown_secs: u64,

    /// SQLite database path
    #[arg(long, env = "TACTICS_DB", default_value = "tactics.db")]
    pub db: PathBuf,
}

fn parse_concurrency(value: &str) -> Result<usize, String> {
    let parsed: usize = value
        .parse()
        .map_err(|_| format!("'{value}' is not a valid count"))?;
    if parsed == 0 || parsed > MAX_CONCURRENCY {
        return Err(format!("concurrency must be 1..={MAX_CONCURRENCY}"));
    }
    Ok(parsed)
}

/// Parse a comma-separated id list, rejecting malformed entries.
fn parse_leagues_csv(csv: &str) -> Result<Vec<i64>, CliError> {
    csv.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse()
                .map_err(|_| CliError::InvalidArgument(format!("bad league id '{part}'")))
        })
        .collect()
}

/// Parse a leagues file leniently: blank lines and '#' comments are skipped,
/// as is any line that is not an integer.
fn parse_leagues_file(contents: &str) -> Vec<i64> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.parse().ok())
        .collect()
}

/// Union all league sources, sorted and deduplicated; fall back to the
/// built-in default list when every source is empty.
fn combine_leagues(sources: Vec<Vec<i64>>) -> Vec<i64> {
    let merged: BTreeSet<i64> = sources.into_iter().flatten().collect();
    if merged.is_empty() {
        DEFAULT_LEAGUES.to_vec()
    } else {
        merged.into_iter().collect()
    }
}

impl SyncArgs {
    /// Resolve the league set from flags, file and environment.
    fn resolve_leagues(&self) -> Result<Vec<i64>, CliError> {
        let mut sources = vec![self.league.clone()];
        if let Some(csv) = &self.leagues {
            sources.push(parse_leagues_csv(csv)?);
        }
        if let Some(path) = &self.leagues_file {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                CliError::Configuration(format!("cannot read {}: {e}", path.display()))
            })?;
            sources.push(parse_leagues_file(&contents));
        }
        if let Ok(csv) = std::env::var("LEAGUES_CSV") {
            sources.push(parse_leagues_file(&csv.replace(',', "\n")));
        }
        Ok(combine_leagues(sources))
    }

    /// Execute the sync run.
    ///
    /// The exit status reflects whether the run itself completed; individual
    /// league failures are reported in the logs, not via the exit code.
    pub async fn execute(&self) -> Result<(), CliError> {
        let leagues = self.resolve_leagues()?;
        let config = Arc::new(SyncConfig {
            season_id: self.season,
            refresh_days: self.refresh_days,
            concurrency: self.par,
            qps: self.qps,
            cooldown_secs: self.cooldown_secs,
            ..Default::default()
        });
        info!(
            season_id = config.season_id,
            leagues = leagues.len(),
            concurrency = config.concurrency,
            qps = config.qps,
            refresh_days = config.refresh_days,
            db = %self.db.display(),
            "starting sync run"
        );

        let store = StoreGateway::open(&self.db).await?;
        let http = default_http_client()
            .map_err(|e| CliError::Configuration(format!("cannot build HTTP client: {e}")))?;
        let endpoints = Endpoints::default();
        let limiter = RateLimiter::new(config.qps, JITTER_FRACTION);
        let transport = Transport::new(http, limiter, endpoints.rpc_url.clone(), config.max_attempts);
        let source = Arc::new(SourceClient::new(transport, endpoints));

        let report = RunCoordinator::new(config)
            .run(&leagues, source, store)
            .await;
        for (league_id, error) in &report.failed {
            warn!(league_id, error = %error, "league did not complete");
        }
        Ok(())
    }
}
