//! Typed client over the remote RPC and REST endpoints

use super::decode;
use super::transport::{SourceRequest, Transport};
use super::{ClubTactics, FixtureSource, SourceResult};
use crate::Fixture;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::future::Future;
use tracing::{debug, warn};

/// Remote endpoint locations, overridable for tests.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// JSON-RPC endpoint (single fixed URL for all RPC methods)
    pub rpc_url: String,
    /// REST base for per-fixture tactics history; the fixture id is appended
    pub tactics_base: String,
    /// Secondary REST discovery endpoint, queried by league id
    pub discovery_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            rpc_url: "https://gsppub.soccerverse.io/".to_string(),
            tactics_base: "https://services.soccerverse.com/api/fixture_history/tactics/"
                .to_string(),
            discovery_url: "https://services.soccerverse.com/api/league_clubs".to_string(),
        }
    }
}

/// Source client implementing [`FixtureSource`] over the resilient transport.
#[derive(Clone)]
pub struct SourceClient {
    transport: Transport,
    endpoints: Endpoints,
}

impl SourceClient {
    /// Create a client over an already-configured transport.
    pub fn new(transport: Transport, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// The ordered club-discovery strategy chain. The primary RPC method
    /// first, then the broader league fetch, then the REST fallback.
    fn discovery_strategies(&self, league_id: i64) -> Vec<(&'static str, SourceRequest)> {
        vec![
            (
                "get_league_clubs",
                SourceRequest::Rpc {
                    method: "get_league_clubs",
                    params: json!({ "league_id": league_id }),
                },
            ),
            (
                "get_league",
                SourceRequest::Rpc {
                    method: "get_league",
                    params: json!({ "league_id": league_id }),
                },
            ),
            (
                "league_clubs_rest",
                SourceRequest::Get {
                    url: format!("{}?league_id={league_id}", self.endpoints.discovery_url),
                },
            ),
        ]
    }
}

/// Walk the discovery strategies in order until one yields clubs.
///
/// A strategy that errors or comes back empty is absorbed with a log line
/// and the next one is tried; all strategies failing yields an empty list,
/// never an error. Generic over the request executor so the fall-through
/// behavior is testable without a live endpoint.
async fn run_discovery<F, Fut>(
    strategies: Vec<(&'static str, SourceRequest)>,
    league_id: i64,
    mut execute: F,
) -> Vec<i64>
where
    F: FnMut(&'static str, SourceRequest) -> Fut,
    Fut: Future<Output = SourceResult<Value>>,
{
    for (tag, request) in strategies {
        match execute(tag, request).await {
            Ok(body) => {
                let ids = decode::extract_club_ids(&body);
                if !ids.is_empty() {
                    return ids.into_iter().collect();
                }
                debug!(league_id, tag, "discovery returned no clubs, trying next");
            }
            Err(e) => {
                warn!(league_id, tag, error = %e, "discovery strategy failed, trying next");
            }
        }
    }
    Vec::new()
}

#[async_trait]
impl FixtureSource for SourceClient {
    async fn list_league_clubs(&self, league_id: i64) -> Vec<i64> {
        let transport = self.transport.clone();
        run_discovery(
            self.discovery_strategies(league_id),
            league_id,
            move |tag, request| {
                let transport = transport.clone();
                async move { transport.execute(tag, &request).await }
            },
        )
        .await
    }

    async fn list_club_schedule(
        &self,
        club_id: i64,
        league_id: i64,
        season_id: i64,
    ) -> SourceResult<Vec<Fixture>> {
        let request = SourceRequest::Rpc {
            method: "get_club_schedule",
            params: json!({ "club_id": club_id, "season_id": season_id }),
        };
        let body = self.transport.execute("get_club_schedule", &request).await?;
        Ok(decode::extract_schedule_entries(&body)
            .iter()
            .filter_map(|entry| decode::fixture_from_value(entry, league_id, season_id))
            .collect())
    }

    async fn fetch_fixture_core(
        &self,
        fixture_id: i64,
        league_id: i64,
        season_id: i64,
    ) -> SourceResult<Option<Fixture>> {
        let request = SourceRequest::Rpc {
            method: "get_fixture",
            params: json!({ "fixture_id": fixture_id }),
        };
        let body = self.transport.execute("get_fixture", &request).await?;
        Ok(body
            .get("result")
            .and_then(|record| decode::fixture_from_value(record, league_id, season_id)))
    }

    async fn fetch_tactics(&self, fixture_id: i64) -> SourceResult<Vec<ClubTactics>> {
        let request = SourceRequest::Get {
            url: format!("{}{fixture_id}", self.endpoints.tactics_base),
        };
        let tag = format!("tactics {fixture_id}");
        let body = self.transport.execute(&tag, &request).await?;
        Ok(decode::extract_club_tactics(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceError;

    fn strategies() -> Vec<(&'static str, SourceRequest)> {
        vec![
            (
                "get_league_clubs",
                SourceRequest::Rpc {
                    method: "get_league_clubs",
                    params: json!({ "league_id": 1 }),
                },
            ),
            (
                "get_league",
                SourceRequest::Rpc {
                    method: "get_league",
                    params: json!({ "league_id": 1 }),
                },
            ),
            (
                "league_clubs_rest",
                SourceRequest::Get {
                    url: "http://localhost/league_clubs?league_id=1".to_string(),
                },
            ),
        ]
    }

    fn exhausted(tag: &str) -> SourceError {
        SourceError::TransportExhausted {
            tag: tag.to_string(),
            last: "HTTP 429".to_string(),
        }
    }

    #[tokio::test]
    async fn test_failing_strategy_falls_through_to_next() {
        let clubs = run_discovery(strategies(), 1, |tag, _request| async move {
            match tag {
                "get_league_clubs" => Err(exhausted(tag)),
                _ => Ok(json!({"result": {"clubs": [2, 1]}})),
            }
        })
        .await;
        assert_eq!(clubs, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_empty_strategies_fall_through_to_rest_fallback() {
        let clubs = run_discovery(strategies(), 1, |tag, _request| async move {
            match tag {
                "league_clubs_rest" => Ok(json!([{"club_id": 7}])),
                _ => Ok(json!({"result": {"clubs": []}})),
            }
        })
        .await;
        assert_eq!(clubs, vec![7]);
    }

    #[tokio::test]
    async fn test_all_strategies_failing_yields_empty_not_error() {
        let clubs =
            run_discovery(strategies(), 1, |tag, _request| async move { Err(exhausted(tag)) })
                .await;
        assert!(clubs.is_empty());
    }

    #[tokio::test]
    async fn test_strategies_are_tried_in_priority_order() {
        let mut seen = Vec::new();
        let clubs = run_discovery(strategies(), 1, |tag, _request| {
            seen.push(tag);
            async move { Err(exhausted(tag)) }
        })
        .await;
        assert!(clubs.is_empty());
        assert_eq!(seen, vec!["get_league_clubs", "get_league", "league_clubs_rest"]);
    }
}
