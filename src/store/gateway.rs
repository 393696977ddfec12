//! [`StoreGateway`]: batched, idempotent access to the SQLite store

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use rusqlite::{params, OptionalExtension as _};

use crate::config::SELECT_CHUNK_SIZE;
use crate::store::{schema::SCHEMA, StoreResult};
use crate::{Fixture, Side, SideRow};

const UPSERT_FIXTURE_SQL: &str = "
INSERT INTO fixtures
  (fixture_id, league_id, season_id, kickoff_at,
   home_club, away_club, home_goals, away_goals, played)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
ON CONFLICT (fixture_id) DO UPDATE SET
  league_id  = excluded.league_id,
  season_id  = excluded.season_id,
  kickoff_at = excluded.kickoff_at,
  home_club  = excluded.home_club,
  away_club  = excluded.away_club,
  home_goals = excluded.home_goals,
  away_goals = excluded.away_goals,
  played     = excluded.played
";

const UPSERT_SIDE_SQL: &str = "
INSERT INTO fixture_sides
  (fixture_id, side, club_id, opponent_club_id,
   goals_for, goals_against, formation_id, play_style, lineup, tactics_history)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
ON CONFLICT (fixture_id, side) DO UPDATE SET
  club_id          = excluded.club_id,
  opponent_club_id = excluded.opponent_club_id,
  goals_for        = excluded.goals_for,
  goals_against    = excluded.goals_against,
  formation_id     = excluded.formation_id,
  play_style       = excluded.play_style,
  lineup           = excluded.lineup,
  tactics_history  = excluded.tactics_history
";

fn fixture_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Fixture> {
    Ok(Fixture {
        fixture_id: row.get(0)?,
        league_id: row.get(1)?,
        season_id: row.get(2)?,
        kickoff_at: row.get(3)?,
        home_club: row.get(4)?,
        away_club: row.get(5)?,
        home_goals: row.get(6)?,
        away_goals: row.get(7)?,
        played: row.get(8)?,
    })
}

const SELECT_FIXTURE_COLUMNS: &str = "fixture_id, league_id, season_id, kickoff_at, \
     home_club, away_club, home_goals, away_goals, played";

/// Gateway over a single SQLite file (or in-memory database in tests).
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct StoreGateway {
    conn: tokio_rusqlite::Connection,
}

impl StoreGateway {
    /// Open (or create) a store at `path` and apply the schema.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = tokio_rusqlite::Connection::open(path).await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory store, useful for testing.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> StoreResult<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Upsert core fixture rows, keyed by fixture id. Empty input is a no-op.
    pub async fn upsert_fixtures(&self, rows: &[Fixture]) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let rows = rows.to_vec();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare_cached(UPSERT_FIXTURE_SQL)?;
                    for row in &rows {
                        stmt.execute(params![
                            row.fixture_id,
                            row.league_id,
                            row.season_id,
                            row.kickoff_at,
                            row.home_club,
                            row.away_club,
                            row.home_goals,
                            row.away_goals,
                            row.played,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Upsert side rows, keyed by (fixture id, side). Empty input is a no-op.
    pub async fn upsert_sides(&self, rows: &[SideRow]) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        // Encode JSON columns up front so encoding failures surface as
        // store errors rather than poisoning the connection task.
        let mut encoded = Vec::with_capacity(rows.len());
        for row in rows {
            encoded.push((
                row.fixture_id,
                row.side.as_str(),
                row.club_id,
                row.opponent_club_id,
                row.goals_for,
                row.goals_against,
                row.formation_id,
                row.play_style.clone(),
                serde_json::to_string(&row.lineup)?,
                serde_json::to_string(&row.tactics_history)?,
            ));
        }
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare_cached(UPSERT_SIDE_SQL)?;
                    for row in &encoded {
                        stmt.execute(params![
                            row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7, row.8, row.9,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// All persisted fixture ids for one league and season.
    pub async fn select_fixture_ids(
        &self,
        league_id: i64,
        season_id: i64,
    ) -> StoreResult<HashSet<i64>> {
        let ids = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT fixture_id FROM fixtures WHERE league_id = ?1 AND season_id = ?2",
                )?;
                let ids = stmt
                    .query_map(params![league_id, season_id], |row| row.get(0))?
                    .collect::<rusqlite::Result<HashSet<i64>>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }

    /// Persisted (fixture id, side) keys among `fixture_ids`.
    ///
    /// Lookups are chunked internally to respect the bound-parameter limit;
    /// callers see one merged set regardless of chunking.
    pub async fn select_side_keys(
        &self,
        fixture_ids: &[i64],
    ) -> StoreResult<HashSet<(i64, Side)>> {
        let mut keys = HashSet::new();
        for chunk in fixture_ids.chunks(SELECT_CHUNK_SIZE) {
            let chunk = chunk.to_vec();
            let pairs: Vec<(i64, String)> = self
                .conn
                .call(move |conn| {
                    let placeholders = vec!["?"; chunk.len()].join(", ");
                    let sql = format!(
                        "SELECT fixture_id, side FROM fixture_sides \
                         WHERE fixture_id IN ({placeholders})"
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let pairs = stmt
                        .query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                            Ok((row.get(0)?, row.get(1)?))
                        })?
                        .collect::<rusqlite::Result<Vec<(i64, String)>>>()?;
                    Ok(pairs)
                })
                .await?;
            keys.extend(
                pairs
                    .into_iter()
                    .filter_map(|(id, side)| Side::from_str(&side).ok().map(|s| (id, s))),
            );
        }
        Ok(keys)
    }

    /// Played fixtures of a league/season whose kickoff falls within the
    /// trailing `days` window ending at `now_ts`. Supports the degraded
    /// path when live discovery yields nothing.
    pub async fn select_recent_played(
        &self,
        league_id: i64,
        season_id: i64,
        days: i64,
        now_ts: i64,
    ) -> StoreResult<Vec<Fixture>> {
        let cutoff = now_ts - days * 86_400;
        let rows = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {SELECT_FIXTURE_COLUMNS} FROM fixtures \
                     WHERE league_id = ?1 AND season_id = ?2 \
                       AND played = 1 AND kickoff_at >= ?3 \
                     ORDER BY fixture_id"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![league_id, season_id, cutoff], fixture_from_row)?
                    .collect::<rusqlite::Result<Vec<Fixture>>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    /// One fixture by id, the read-from-store last resort during detail
    /// fetch.
    pub async fn select_fixture(&self, fixture_id: i64) -> StoreResult<Option<Fixture>> {
        let row = self
            .conn
            .call(move |conn| {
                let sql =
                    format!("SELECT {SELECT_FIXTURE_COLUMNS} FROM fixtures WHERE fixture_id = ?1");
                let mut stmt = conn.prepare_cached(&sql)?;
                let row = stmt
                    .query_row(params![fixture_id], fixture_from_row)
                    .optional()?;
                Ok(row)
            })
            .await?;
        Ok(row)
    }
}
