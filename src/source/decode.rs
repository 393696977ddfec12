//! Tolerant decoding of source response shapes
//!
//! The RPC endpoint nests its payloads inconsistently: club arrays may sit
//! under `result.clubs`, `result.data.clubs`, a bare `result` array or even
//! the document root, and elements may be plain integers or `{club_id: ..}`
//! objects. All of that variance is absorbed here so the client exposes one
//! normalized shape.

use crate::source::ClubTactics;
use crate::Fixture;
use serde_json::Value;
use std::collections::BTreeSet;

/// Read an integer field that may arrive as a number, a numeric string, or
/// not at all. Absent and malformed values default to zero, negatives are
/// clamped to zero.
fn int_field(value: &Value, key: &str) -> i64 {
    let field = value.get(key);
    let n = match field {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    };
    n.max(0)
}

/// Read the upstream `played` flag, which arrives as `1`/`0` or a bool.
fn played_field(value: &Value) -> bool {
    match value.get("played") {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) == 1,
        Some(Value::String(s)) => s.trim() == "1",
        _ => false,
    }
}

/// Coerce one club-list element to an id. Accepts plain integers, numeric
/// strings, and `{club_id: ..}` objects.
fn club_id_of(element: &Value) -> Option<i64> {
    let id = match element {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        Value::Object(_) => match element.get("club_id")? {
            Value::Number(n) => n.as_i64()?,
            Value::String(s) => s.trim().parse::<i64>().ok()?,
            _ => return None,
        },
        _ => return None,
    };
    (id >= 0).then_some(id)
}

/// Extract a deduplicated, sorted set of club ids from any of the known
/// response nestings. Returns an empty set when no nesting matches.
pub fn extract_club_ids(body: &Value) -> BTreeSet<i64> {
    let candidates = [
        body.pointer("/result/clubs"),
        body.pointer("/result/data/clubs"),
        body.get("result"),
        Some(body),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Value::Array(elements) = candidate {
            let ids: BTreeSet<i64> = elements.iter().filter_map(club_id_of).collect();
            if !ids.is_empty() {
                return ids;
            }
        }
    }
    BTreeSet::new()
}

/// Extract the raw schedule entries from an RPC response, whichever of the
/// known nestings (`result.data`, `result`) carries them.
pub fn extract_schedule_entries(body: &Value) -> Vec<Value> {
    for candidate in [body.pointer("/result/data"), body.get("result")] {
        if let Some(Value::Array(entries)) = candidate {
            if !entries.is_empty() {
                return entries.clone();
            }
        }
    }
    Vec::new()
}

/// Build a core fixture row from one raw schedule entry or fixture record.
///
/// Requires a usable `fixture_id`; every other field defaults to zero when
/// absent upstream. A `played` flag with zero goals is passed through
/// verbatim, no intent is inferred.
pub fn fixture_from_value(value: &Value, league_id: i64, season_id: i64) -> Option<Fixture> {
    let fixture_id = match value.get("fixture_id") {
        Some(Value::Number(n)) => n.as_i64()?,
        Some(Value::String(s)) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    if fixture_id < 0 {
        return None;
    }
    Some(Fixture {
        fixture_id,
        league_id,
        season_id,
        kickoff_at: int_field(value, "date"),
        home_club: int_field(value, "home_club"),
        away_club: int_field(value, "away_club"),
        home_goals: int_field(value, "home_goals"),
        away_goals: int_field(value, "away_goals"),
        played: played_field(value),
    })
}

/// Extract per-club tactics records from the tactics endpoint response.
///
/// Entries without a `club_id` are dropped; a missing `tactic_actions`
/// array becomes empty, which downstream treats as "no usable detail".
pub fn extract_club_tactics(body: &Value) -> Vec<ClubTactics> {
    let Value::Array(entries) = body else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let club_id = club_id_of(entry)?;
            let tactic_actions = match entry.get("tactic_actions") {
                Some(Value::Array(actions)) => actions.clone(),
                _ => Vec::new(),
            };
            Some(ClubTactics {
                club_id,
                tactic_actions,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_club_ids_from_result_clubs() {
        let body = json!({"result": {"clubs": [3, 1, 2, 1]}});
        let ids: Vec<i64> = extract_club_ids(&body).into_iter().collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_club_ids_from_nested_data() {
        let body = json!({"result": {"data": {"clubs": [{"club_id": 9}, {"club_id": 4}]}}});
        let ids: Vec<i64> = extract_club_ids(&body).into_iter().collect();
        assert_eq!(ids, vec![4, 9]);
    }

    #[test]
    fn test_club_ids_from_bare_result_array() {
        let body = json!({"result": [{"club_id": "7"}, {"name": "no id"}, 5]});
        let ids: Vec<i64> = extract_club_ids(&body).into_iter().collect();
        assert_eq!(ids, vec![5, 7]);
    }

    #[test]
    fn test_club_ids_from_root_array() {
        let body = json!([{"club_id": 11}, {"club_id": 12}]);
        let ids: Vec<i64> = extract_club_ids(&body).into_iter().collect();
        assert_eq!(ids, vec![11, 12]);
    }

    #[test]
    fn test_club_ids_empty_on_unknown_shape() {
        assert!(extract_club_ids(&json!({"result": null})).is_empty());
        assert!(extract_club_ids(&json!({"error": "boom"})).is_empty());
    }

    #[test]
    fn test_schedule_entries_prefer_result_data() {
        let body = json!({"result": {"data": [{"fixture_id": 1}]}});
        assert_eq!(extract_schedule_entries(&body).len(), 1);

        let body = json!({"result": [{"fixture_id": 2}, {"fixture_id": 3}]});
        assert_eq!(extract_schedule_entries(&body).len(), 2);

        assert!(extract_schedule_entries(&json!({"result": {}})).is_empty());
    }

    #[test]
    fn test_fixture_defaults_absent_fields_to_zero() {
        let fixture = fixture_from_value(&json!({"fixture_id": 100}), 637, 2).unwrap();
        assert_eq!(fixture.fixture_id, 100);
        assert_eq!(fixture.league_id, 637);
        assert_eq!(fixture.season_id, 2);
        assert_eq!(fixture.home_club, 0);
        assert_eq!(fixture.away_goals, 0);
        assert!(!fixture.played);
    }

    #[test]
    fn test_fixture_clamps_negative_counts() {
        let fixture =
            fixture_from_value(&json!({"fixture_id": 5, "home_goals": -2, "away_club": -1}), 1, 1)
                .unwrap();
        assert_eq!(fixture.home_goals, 0);
        assert_eq!(fixture.away_club, 0);
    }

    #[test]
    fn test_fixture_requires_id() {
        assert!(fixture_from_value(&json!({"date": 123}), 1, 1).is_none());
        assert!(fixture_from_value(&json!({"fixture_id": "abc"}), 1, 1).is_none());
    }

    #[test]
    fn test_played_flag_variants() {
        let played = |v: Value| fixture_from_value(&v, 1, 1).unwrap().played;
        assert!(played(json!({"fixture_id": 1, "played": 1})));
        assert!(played(json!({"fixture_id": 1, "played": true})));
        assert!(!played(json!({"fixture_id": 1, "played": 0})));
        assert!(!played(json!({"fixture_id": 1})));
    }

    #[test]
    fn test_club_tactics_drops_idless_entries() {
        let body = json!([
            {"club_id": 1, "tactic_actions": [{"formation_id": 8}]},
            {"tactic_actions": [{"formation_id": 9}]},
            {"club_id": 2}
        ]);
        let tactics = extract_club_tactics(&body);
        assert_eq!(tactics.len(), 2);
        assert_eq!(tactics[0].club_id, 1);
        assert_eq!(tactics[0].tactic_actions.len(), 1);
        assert!(tactics[1].tactic_actions.is_empty());
    }

    #[test]
    fn test_club_tactics_non_array_is_empty() {
        assert!(extract_club_tactics(&json!({"error": "nope"})).is_empty());
    }
}
