//! Pure reconciliation of observed schedules against persisted state
//!
//! The filter order here is load-bearing: new-or-recent first, then the
//! played filter, then the sides-completeness filter. That guarantees
//! unplayed fixtures are never detail-fetched (tactics only exist
//! post-match) and already-complete fixtures are never re-fetched, bounding
//! API load to genuinely new information.

use crate::{Fixture, Side};
use std::collections::{btree_map::Entry, BTreeMap, BTreeSet, HashSet};

/// Seconds per day, for the refresh-window cutoff.
const DAY_SECS: i64 = 86_400;

/// Deduplicate freshly observed core rows by fixture id.
///
/// Two clubs' schedules each report their shared fixture; when the
/// duplicates disagree on `played`, the played variant wins.
pub fn dedupe_schedule(rows: Vec<Fixture>) -> Vec<Fixture> {
    let mut by_id: BTreeMap<i64, Fixture> = BTreeMap::new();
    for row in rows {
        match by_id.entry(row.fixture_id) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                if row.played && !slot.get().played {
                    slot.insert(row);
                }
            }
        }
    }
    by_id.into_values().collect()
}

/// Fixture ids needing detail refresh, before the sides-completeness filter:
/// (new OR recent) AND played, sorted ascending for determinism.
///
/// `rows` must already be deduplicated. A zero kickoff timestamp (unknown
/// upstream) never counts as recent.
pub fn candidate_ids(
    rows: &[Fixture],
    persisted: &HashSet<i64>,
    refresh_days: i64,
    now_ts: i64,
) -> Vec<i64> {
    let cutoff = now_ts - refresh_days * DAY_SECS;
    let mut candidates: BTreeSet<i64> = BTreeSet::new();
    for row in rows {
        let is_new = !persisted.contains(&row.fixture_id);
        let is_recent = row.kickoff_at != 0 && row.kickoff_at >= cutoff;
        if is_new || is_recent {
            candidates.insert(row.fixture_id);
        }
    }
    let played: HashSet<i64> = rows
        .iter()
        .filter(|row| row.played)
        .map(|row| row.fixture_id)
        .collect();
    candidates
        .into_iter()
        .filter(|id| played.contains(id))
        .collect()
}

/// Drop candidates whose both sides are already persisted; nothing left
/// to do for them.
pub fn drop_completed(ids: Vec<i64>, sides: &HashSet<(i64, Side)>) -> Vec<i64> {
    ids.into_iter()
        .filter(|id| {
            !(sides.contains(&(*id, Side::Home)) && sides.contains(&(*id, Side::Away)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(id: i64, kickoff_at: i64, played: bool) -> Fixture {
        Fixture {
            fixture_id: id,
            league_id: 637,
            season_id: 2,
            kickoff_at,
            home_club: 1,
            away_club: 2,
            home_goals: 0,
            away_goals: 0,
            played,
        }
    }

    #[test]
    fn test_dedupe_prefers_played_variant() {
        let rows = vec![fixture(100, 1000, false), fixture(100, 1000, true)];
        let deduped = dedupe_schedule(rows);
        assert_eq!(deduped.len(), 1);
        assert!(deduped[0].played);

        // Same preference regardless of arrival order.
        let rows = vec![fixture(100, 1000, true), fixture(100, 1000, false)];
        let deduped = dedupe_schedule(rows);
        assert_eq!(deduped.len(), 1);
        assert!(deduped[0].played);
    }

    #[test]
    fn test_candidates_never_include_unplayed() {
        let now = 1_000_000;
        let rows = vec![
            fixture(1, now, true),
            fixture(2, now, false),
            fixture(3, now, false),
        ];
        let ids = candidate_ids(&rows, &HashSet::new(), 14, now);
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_old_persisted_fixtures_are_not_candidates() {
        let now = 100 * DAY_SECS;
        let old = fixture(5, now - 30 * DAY_SECS, true);
        let persisted: HashSet<i64> = [5].into_iter().collect();
        assert!(candidate_ids(&[old.clone()], &persisted, 14, now).is_empty());

        // The same old fixture is a candidate while still unseen.
        assert_eq!(candidate_ids(&[old], &HashSet::new(), 14, now), vec![5]);
    }

    #[test]
    fn test_recent_persisted_fixtures_are_candidates() {
        let now = 100 * DAY_SECS;
        let recent = fixture(7, now - 2 * DAY_SECS, true);
        let persisted: HashSet<i64> = [7].into_iter().collect();
        assert_eq!(candidate_ids(&[recent], &persisted, 14, now), vec![7]);
    }

    #[test]
    fn test_zero_kickoff_is_never_recent() {
        let now = 100 * DAY_SECS;
        let unknown = fixture(9, 0, true);
        let persisted: HashSet<i64> = [9].into_iter().collect();
        assert!(candidate_ids(&[unknown], &persisted, 14, now).is_empty());
    }

    #[test]
    fn test_candidates_sorted_ascending() {
        let now = 1_000_000;
        let rows = vec![fixture(30, now, true), fixture(10, now, true), fixture(20, now, true)];
        assert_eq!(candidate_ids(&rows, &HashSet::new(), 14, now), vec![10, 20, 30]);
    }

    #[test]
    fn test_drop_completed_requires_both_sides() {
        let mut sides = HashSet::new();
        sides.insert((1, Side::Home));
        sides.insert((1, Side::Away));
        sides.insert((2, Side::Home));

        let targets = drop_completed(vec![1, 2, 3], &sides);
        assert_eq!(targets, vec![2, 3]);
    }
}
