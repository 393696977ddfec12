//! End-to-end league pipeline tests against an in-memory store

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use tactics_sync::config::SyncConfig;
use tactics_sync::source::{ClubTactics, FixtureSource, SourceError, SourceResult};
use tactics_sync::store::StoreGateway;
use std::sync::Arc;
use tactics_sync::sync::{LeaguePipeline, RunCoordinator};
use tactics_sync::{Fixture, Side};

const NOW: i64 = 100 * 86_400;

/// Canned source: club discovery, per-club schedules and per-fixture tactics
/// all come from in-memory maps.
#[derive(Default)]
struct MockSource {
    clubs: Vec<i64>,
    schedules: HashMap<i64, Vec<Fixture>>,
    tactics: HashMap<i64, Vec<ClubTactics>>,
    fail_tactics: bool,
}

#[async_trait]
impl FixtureSource for MockSource {
    async fn list_league_clubs(&self, _league_id: i64) -> Vec<i64> {
        self.clubs.clone()
    }

    async fn list_club_schedule(
        &self,
        club_id: i64,
        _league_id: i64,
        _season_id: i64,
    ) -> SourceResult<Vec<Fixture>> {
        Ok(self.schedules.get(&club_id).cloned().unwrap_or_default())
    }

    async fn fetch_fixture_core(
        &self,
        _fixture_id: i64,
        _league_id: i64,
        _season_id: i64,
    ) -> SourceResult<Option<Fixture>> {
        Ok(None)
    }

    async fn fetch_tactics(&self, fixture_id: i64) -> SourceResult<Vec<ClubTactics>> {
        if self.fail_tactics {
            return Err(SourceError::TransportExhausted {
                tag: format!("tactics {fixture_id}"),
                last: "HTTP 429".to_string(),
            });
        }
        Ok(self.tactics.get(&fixture_id).cloned().unwrap_or_default())
    }
}

fn played_fixture(id: i64, home: i64, away: i64) -> Fixture {
    Fixture {
        fixture_id: id,
        league_id: 637,
        season_id: 2,
        kickoff_at: NOW - 86_400,
        home_club: home,
        away_club: away,
        home_goals: 3,
        away_goals: 1,
        played: true,
    }
}

fn tactics_for(clubs: &[i64]) -> Vec<ClubTactics> {
    clubs
        .iter()
        .map(|&club_id| ClubTactics {
            club_id,
            tactic_actions: vec![json!({
                "formation_id": 8,
                "play_style": "attacking",
                "lineup": [1, 2, 3],
            })],
        })
        .collect()
}

#[tokio::test]
async fn test_new_league_syncs_core_and_sides() {
    let mut source = MockSource {
        clubs: vec![10, 20],
        ..Default::default()
    };
    // Both clubs report the shared fixture; one side still sees it unplayed.
    let mut stale = played_fixture(100, 10, 20);
    stale.played = false;
    source.schedules.insert(10, vec![played_fixture(100, 10, 20)]);
    source.schedules.insert(20, vec![stale]);
    source.tactics.insert(100, tactics_for(&[10, 20]));

    let store = StoreGateway::open_in_memory().await.unwrap();
    let config = SyncConfig::default();
    let summary = LeaguePipeline::new(&source, &store, &config)
        .run(637, NOW)
        .await
        .unwrap();

    assert_eq!(summary.core_rows, 1);
    assert_eq!(summary.targets, 1);
    assert_eq!(summary.side_rows, 2);

    let stored = store.select_fixture(100).await.unwrap().unwrap();
    assert!(stored.played, "played variant wins deduplication");

    let keys = store.select_side_keys(&[100]).await.unwrap();
    assert!(keys.contains(&(100, Side::Home)));
    assert!(keys.contains(&(100, Side::Away)));
}

#[tokio::test]
async fn test_complete_fixtures_are_not_refetched() {
    let mut source = MockSource {
        clubs: vec![10],
        ..Default::default()
    };
    source.schedules.insert(10, vec![played_fixture(100, 10, 20)]);
    source.tactics.insert(100, tactics_for(&[10, 20]));

    let store = StoreGateway::open_in_memory().await.unwrap();
    let config = SyncConfig::default();
    let pipeline = LeaguePipeline::new(&source, &store, &config);

    let first = pipeline.run(637, NOW).await.unwrap();
    assert_eq!(first.side_rows, 2);

    // Both sides persisted, so the rerun selects nothing to detail.
    let second = pipeline.run(637, NOW).await.unwrap();
    assert_eq!(second.targets, 0);
    assert_eq!(second.side_rows, 0);
}

#[tokio::test]
async fn test_missing_tactics_payload_is_not_an_error() {
    let mut source = MockSource {
        clubs: vec![10],
        ..Default::default()
    };
    source.schedules.insert(10, vec![played_fixture(100, 10, 20)]);
    // No tactics entry for fixture 100 at all.

    let store = StoreGateway::open_in_memory().await.unwrap();
    let config = SyncConfig::default();
    let summary = LeaguePipeline::new(&source, &store, &config)
        .run(637, NOW)
        .await
        .unwrap();

    assert_eq!(summary.targets, 1);
    assert_eq!(summary.side_rows, 0);
}

#[tokio::test]
async fn test_tactics_fetch_failure_skips_fixture_only() {
    let mut source = MockSource {
        clubs: vec![10],
        fail_tactics: true,
        ..Default::default()
    };
    source.schedules.insert(10, vec![played_fixture(100, 10, 20)]);

    let store = StoreGateway::open_in_memory().await.unwrap();
    let config = SyncConfig::default();
    let summary = LeaguePipeline::new(&source, &store, &config)
        .run(637, NOW)
        .await
        .unwrap();

    // The league still completes; the fixture is just skipped.
    assert_eq!(summary.side_rows, 0);
    assert!(store.select_fixture(100).await.unwrap().is_some());
}

#[tokio::test]
async fn test_degraded_run_reconciles_from_store() {
    let store = StoreGateway::open_in_memory().await.unwrap();
    store
        .upsert_fixtures(&[played_fixture(100, 10, 20)])
        .await
        .unwrap();

    // Discovery finds nothing, so the pipeline falls back to the
    // recently-played fixtures already persisted.
    let mut source = MockSource::default();
    source.tactics.insert(100, tactics_for(&[10, 20]));

    let config = SyncConfig::default();
    let summary = LeaguePipeline::new(&source, &store, &config)
        .run(637, NOW)
        .await
        .unwrap();

    assert_eq!(summary.core_rows, 0);
    assert_eq!(summary.targets, 1);
    assert_eq!(summary.side_rows, 2);
}

#[tokio::test]
async fn test_coordinator_runs_every_league_to_completion() {
    let mut source = MockSource {
        clubs: vec![10],
        ..Default::default()
    };
    source.schedules.insert(10, vec![played_fixture(100, 10, 20)]);
    source.tactics.insert(100, tactics_for(&[10, 20]));

    let store = StoreGateway::open_in_memory().await.unwrap();
    let config = Arc::new(SyncConfig {
        concurrency: 2,
        ..Default::default()
    });

    // League 999 discovers the same club set in this mock; both leagues
    // must reach a terminal state.
    let report = RunCoordinator::new(config)
        .run(&[637, 999], Arc::new(source), store)
        .await;

    assert!(report.all_succeeded());
    assert_eq!(report.completed.len(), 2);
}
