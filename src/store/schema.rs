//! Store schema, applied idempotently on open

/// Two tables, both keyed by natural identifiers. `lineup` and
/// `tactics_history` hold opaque JSON text; the pipeline never interprets
/// them beyond the first action's formation/lineup/style.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS fixtures (
  fixture_id  INTEGER PRIMARY KEY,
  league_id   INTEGER NOT NULL,
  season_id   INTEGER NOT NULL,
  kickoff_at  INTEGER NOT NULL DEFAULT 0,
  home_club   INTEGER NOT NULL DEFAULT 0,
  away_club   INTEGER NOT NULL DEFAULT 0,
  home_goals  INTEGER NOT NULL DEFAULT 0,
  away_goals  INTEGER NOT NULL DEFAULT 0,
  played      INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_fixtures_league_season
  ON fixtures (league_id, season_id);

CREATE TABLE IF NOT EXISTS fixture_sides (
  fixture_id       INTEGER NOT NULL,
  side             TEXT    NOT NULL CHECK (side IN ('home', 'away')),
  club_id          INTEGER NOT NULL,
  opponent_club_id INTEGER NOT NULL,
  goals_for        INTEGER NOT NULL DEFAULT 0,
  goals_against    INTEGER NOT NULL DEFAULT 0,
  formation_id     INTEGER,
  play_style       TEXT,
  lineup           TEXT    NOT NULL DEFAULT '[]',
  tactics_history  TEXT    NOT NULL DEFAULT '[]',
  PRIMARY KEY (fixture_id, side)
);
";
