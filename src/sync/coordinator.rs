//! Run coordinator: bounded-concurrency league scheduling
//!
//! A counting admission gate (not a priority queue) over league pipelines.
//! Each league's failure is caught and logged with its league id; siblings
//! keep running. A run is complete once every league reached a terminal
//! state. There is no overall retry of failed leagues within one run.

use super::league::{LeaguePipeline, LeagueSummary};
use crate::config::SyncConfig;
use crate::source::FixtureSource;
use crate::store::StoreGateway;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{error, info};

/// Terminal outcome of one run over all requested leagues.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Per-league summaries of the leagues that completed
    pub completed: Vec<LeagueSummary>,
    /// Leagues that failed, with the terminal error message
    pub failed: Vec<(i64, String)>,
}

impl RunReport {
    /// Whether every league completed without an isolated failure.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Schedules league pipelines under a concurrency bound with an optional
/// per-slot cooldown.
pub struct RunCoordinator {
    config: Arc<SyncConfig>,
}

impl RunCoordinator {
    /// Create a coordinator for one run.
    pub fn new(config: Arc<SyncConfig>) -> Self {
        Self { config }
    }

    /// Run every league to a terminal state and report.
    ///
    /// At most `config.concurrency` pipelines are active at once. After a
    /// pipeline finishes (either way), its slot waits out the cooldown
    /// before admitting the next league, smoothing aggregate bursts against
    /// the shared rate limiter.
    pub async fn run(
        &self,
        leagues: &[i64],
        source: Arc<dyn FixtureSource>,
        store: StoreGateway,
    ) -> RunReport {
        let gate = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let cooldown = Duration::from_secs(self.config.cooldown_secs);
        let now_ts = Utc::now().timestamp();
        let mut tasks = JoinSet::new();

        for &league_id in leagues {
            let gate = gate.clone();
            let source = source.clone();
            let store = store.clone();
            let config = self.config.clone();
            tasks.spawn(async move {
                let _permit = match gate.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (league_id, Err("admission gate closed".to_string())),
                };
                let pipeline = LeaguePipeline::new(source.as_ref(), &store, &config);
                let result = pipeline
                    .run(league_id, now_ts)
                    .await
                    .map_err(|e| e.to_string());
                if !cooldown.is_zero() {
                    sleep(cooldown).await;
                }
                (league_id, result)
            });
        }

        let mut report = RunReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(summary))) => report.completed.push(summary),
                Ok((league_id, Err(e))) => {
                    error!(league_id, error = %e, "league sync failed");
                    report.failed.push((league_id, e));
                }
                Err(e) => {
                    // A panicked league task; its siblings are unaffected.
                    error!(error = %e, "league task aborted");
                }
            }
        }

        info!(
            leagues = leagues.len(),
            completed = report.completed.len(),
            failed = report.failed.len(),
            "run finished"
        );
        report
    }
}
