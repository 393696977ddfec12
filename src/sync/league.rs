//! Per-league sync pipeline
//!
//! One run per league, to completion: discover clubs, aggregate schedules,
//! upsert core rows, reconcile, fetch detail, batch-upsert side rows. A
//! single fixture's failure is logged and skipped; only source exhaustion
//! outside the per-fixture loop or a store failure terminates the league.

use super::{reconcile, SyncError};
use crate::config::SyncConfig;
use crate::source::{ClubTactics, FixtureSource};
use crate::store::StoreGateway;
use crate::{Fixture, Side, SideRow};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

/// What one league pipeline accomplished.
#[derive(Debug, Clone, Default)]
pub struct LeagueSummary {
    /// League that was synced
    pub league_id: i64,
    /// Core fixture rows aggregated (0 on the degraded path)
    pub core_rows: usize,
    /// Fixtures selected for detail fetch
    pub targets: usize,
    /// Side rows written
    pub side_rows: usize,
}

/// Build the side rows a fixture's tactics payload supports.
///
/// A row is produced for a side only when the payload has at least one
/// action for that club; the two sides are independent and may come out
/// asymmetrically. Scores are mirrored from the fixture, oriented per side,
/// and formation/lineup/style are taken from the first action.
pub fn build_side_rows(fixture: &Fixture, tactics: &[ClubTactics]) -> Vec<SideRow> {
    let by_club: HashMap<i64, &ClubTactics> = tactics.iter().map(|t| (t.club_id, t)).collect();
    let mut rows = Vec::new();

    for (club_id, side) in [(fixture.home_club, Side::Home), (fixture.away_club, Side::Away)] {
        let Some(club) = by_club.get(&club_id) else {
            continue;
        };
        let Some(first) = club.tactic_actions.first() else {
            continue;
        };

        let lineup = match first.get("lineup") {
            Some(Value::Array(players)) => players.clone(),
            _ => Vec::new(),
        };
        let formation_id = first.get("formation_id").and_then(Value::as_i64);
        let play_style = match first.get("play_style") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let (goals_for, goals_against, opponent_club_id) = match side {
            Side::Home => (fixture.home_goals, fixture.away_goals, fixture.away_club),
            Side::Away => (fixture.away_goals, fixture.home_goals, fixture.home_club),
        };

        rows.push(SideRow {
            fixture_id: fixture.fixture_id,
            side,
            club_id,
            opponent_club_id,
            goals_for,
            goals_against,
            formation_id,
            play_style,
            lineup,
            tactics_history: club.tactic_actions.clone(),
        });
    }
    rows
}

/// The per-league state machine.
pub struct LeaguePipeline<'a> {
    source: &'a dyn FixtureSource,
    store: &'a StoreGateway,
    config: &'a SyncConfig,
}

impl<'a> LeaguePipeline<'a> {
    /// Wire a pipeline over the shared source, store and config.
    pub fn new(
        source: &'a dyn FixtureSource,
        store: &'a StoreGateway,
        config: &'a SyncConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// Run the league to completion. `now_ts` anchors the refresh window.
    pub async fn run(&self, league_id: i64, now_ts: i64) -> Result<LeagueSummary, SyncError> {
        let season_id = self.config.season_id;
        let mut summary = LeagueSummary {
            league_id,
            ..Default::default()
        };

        // DISCOVER + AGGREGATE
        let clubs = self.source.list_league_clubs(league_id).await;
        let mut observed = Vec::new();
        for club_id in clubs {
            match self
                .source
                .list_club_schedule(club_id, league_id, season_id)
                .await
            {
                Ok(mut schedule) => observed.append(&mut schedule),
                Err(e) => {
                    warn!(league_id, club_id, error = %e, "schedule fetch failed, treating as empty");
                }
            }
        }
        let core_rows = reconcile::dedupe_schedule(observed);
        summary.core_rows = core_rows.len();
        info!(league_id, rows = core_rows.len(), "aggregated schedule");

        // UPSERT_CORE + RECONCILE, or the degraded store-fallback branch.
        let (candidates, in_hand): (Vec<i64>, HashMap<i64, Fixture>) = if core_rows.is_empty() {
            let recent = self
                .store
                .select_recent_played(league_id, season_id, self.config.refresh_days, now_ts)
                .await?;
            info!(
                league_id,
                rows = recent.len(),
                "no live schedule, reconciling from persisted recent fixtures"
            );
            let ids = recent.iter().map(|row| row.fixture_id).collect();
            let in_hand = recent.into_iter().map(|row| (row.fixture_id, row)).collect();
            (ids, in_hand)
        } else {
            // Snapshot the persisted set before upserting, otherwise every
            // observed fixture would count as already known.
            let persisted = self.store.select_fixture_ids(league_id, season_id).await?;
            self.store.upsert_fixtures(&core_rows).await?;
            info!(league_id, rows = core_rows.len(), "upserted core fixtures");
            let ids =
                reconcile::candidate_ids(&core_rows, &persisted, self.config.refresh_days, now_ts);
            let in_hand = core_rows.into_iter().map(|row| (row.fixture_id, row)).collect();
            (ids, in_hand)
        };

        let side_keys = self.store.select_side_keys(&candidates).await?;
        let targets = reconcile::drop_completed(candidates, &side_keys);
        summary.targets = targets.len();
        if targets.is_empty() {
            info!(league_id, "nothing to detail");
            return Ok(summary);
        }

        // DETAIL_FETCH + UPSERT_SIDES
        let mut batch: Vec<SideRow> = Vec::new();
        for fixture_id in targets {
            let Some(core) = self
                .resolve_core(fixture_id, league_id, season_id, &in_hand)
                .await?
            else {
                warn!(league_id, fixture_id, "no core record available, skipping");
                continue;
            };

            let tactics = match self.source.fetch_tactics(fixture_id).await {
                Ok(tactics) => tactics,
                Err(e) => {
                    warn!(league_id, fixture_id, error = %e, "tactics fetch failed, skipping fixture");
                    continue;
                }
            };

            // No usable per-side actions means nothing to store, not an error.
            let rows = build_side_rows(&core, &tactics);
            batch.extend(rows);

            if batch.len() >= self.config.side_flush_threshold {
                self.store.upsert_sides(&batch).await?;
                summary.side_rows += batch.len();
                batch.clear();
            }
        }
        if !batch.is_empty() {
            self.store.upsert_sides(&batch).await?;
            summary.side_rows += batch.len();
        }

        info!(
            league_id,
            targets = summary.targets,
            side_rows = summary.side_rows,
            "league sync complete"
        );
        Ok(summary)
    }

    /// Core-record resolution order: already in hand from aggregation, else
    /// fetch by id, else read from the store as a last resort.
    async fn resolve_core(
        &self,
        fixture_id: i64,
        league_id: i64,
        season_id: i64,
        in_hand: &HashMap<i64, Fixture>,
    ) -> Result<Option<Fixture>, SyncError> {
        if let Some(core) = in_hand.get(&fixture_id) {
            return Ok(Some(core.clone()));
        }
        match self
            .source
            .fetch_fixture_core(fixture_id, league_id, season_id)
            .await
        {
            Ok(Some(core)) => return Ok(Some(core)),
            Ok(None) => {}
            Err(e) => {
                warn!(league_id, fixture_id, error = %e, "fixture fetch failed, trying store");
            }
        }
        Ok(self.store.select_fixture(fixture_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> Fixture {
        Fixture {
            fixture_id: 100,
            league_id: 637,
            season_id: 2,
            kickoff_at: 1_700_000_000,
            home_club: 1,
            away_club: 2,
            home_goals: 3,
            away_goals: 1,
            played: true,
        }
    }

    fn actions() -> Vec<Value> {
        vec![
            json!({"formation_id": 8, "play_style": "attacking", "lineup": [11, 22, 33]}),
            json!({"formation_id": 4, "play_style": "defensive", "lineup": [11, 22, 44]}),
        ]
    }

    #[test]
    fn test_both_sides_oriented_correctly() {
        let tactics = vec![
            ClubTactics {
                club_id: 1,
                tactic_actions: actions(),
            },
            ClubTactics {
                club_id: 2,
                tactic_actions: actions(),
            },
        ];
        let rows = build_side_rows(&fixture(), &tactics);
        assert_eq!(rows.len(), 2);

        let home = rows.iter().find(|r| r.side == Side::Home).unwrap();
        assert_eq!(home.club_id, 1);
        assert_eq!(home.opponent_club_id, 2);
        assert_eq!(home.goals_for, 3);
        assert_eq!(home.goals_against, 1);
        assert_eq!(home.formation_id, Some(8));
        assert_eq!(home.play_style.as_deref(), Some("attacking"));
        assert_eq!(home.lineup, vec![json!(11), json!(22), json!(33)]);
        assert_eq!(home.tactics_history.len(), 2);

        let away = rows.iter().find(|r| r.side == Side::Away).unwrap();
        assert_eq!(away.goals_for, 1);
        assert_eq!(away.goals_against, 3);
        assert_eq!(away.opponent_club_id, 1);
    }

    #[test]
    fn test_sides_may_exist_asymmetrically() {
        let tactics = vec![
            ClubTactics {
                club_id: 2,
                tactic_actions: actions(),
            },
            // Home club present but with no actions: no row for it.
            ClubTactics {
                club_id: 1,
                tactic_actions: Vec::new(),
            },
        ];
        let rows = build_side_rows(&fixture(), &tactics);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].side, Side::Away);
    }

    #[test]
    fn test_no_tactics_means_no_rows() {
        assert!(build_side_rows(&fixture(), &[]).is_empty());

        let unrelated = vec![ClubTactics {
            club_id: 99,
            tactic_actions: actions(),
        }];
        assert!(build_side_rows(&fixture(), &unrelated).is_empty());
    }

    #[test]
    fn test_missing_action_fields_default() {
        let tactics = vec![ClubTactics {
            club_id: 1,
            tactic_actions: vec![json!({})],
        }];
        let rows = build_side_rows(&fixture(), &tactics);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].formation_id, None);
        assert_eq!(rows[0].play_style, None);
        assert!(rows[0].lineup.is_empty());
    }
}
