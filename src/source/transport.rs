//! Resilient transport over the remote endpoints
//!
//! Wraps a single outbound call (JSON-RPC post or plain GET) with the shared
//! rate-limiter gate, bounded retries and backoff. HTTP 429 gets its own
//! backoff schedule and log tag; every other transport failure shares the
//! generic one. Exhausting the attempt ceiling is terminal for the calling
//! operation only, never for the whole run.

use super::rate_limit::RateLimiter;
use super::{SourceError, SourceResult};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// HTTP connect timeout (seconds) - time to establish TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// HTTP request timeout (seconds) - overall time for the entire request
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Build the HTTP client shared by all source calls.
///
/// Explicit timeouts bound every individual request so a hung connection
/// cannot stall a league pipeline indefinitely.
pub fn default_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .build()
}

/// One outbound call.
#[derive(Debug, Clone)]
pub enum SourceRequest {
    /// JSON-RPC 2.0 envelope posted to the fixed RPC endpoint
    Rpc {
        /// RPC method name
        method: &'static str,
        /// RPC params object
        params: Value,
    },
    /// Plain GET to a fully constructed URL
    Get {
        /// Absolute request URL
        url: String,
    },
}

/// Outcome of a single physical attempt, before retry classification.
enum AttemptError {
    /// The source answered 429
    RateLimited,
    /// Timeout, connection failure, or a non-2xx status other than 429
    Transport(String),
}

/// Backoff before the next attempt. 429 waits longer than generic errors
/// so rate-limit windows get a chance to reset; both grow linearly with
/// the (1-indexed) attempt number.
fn retry_delay(rate_limited: bool, attempt: u32) -> Duration {
    let base = if rate_limited { 2.0 } else { 1.5 };
    Duration::from_secs_f64(base * f64::from(attempt))
}

/// Rate-limited, retrying executor for source requests.
///
/// No retry state is shared across calls; each `execute` runs its own
/// attempt loop against the shared rate-limiter gate.
#[derive(Clone)]
pub struct Transport {
    http: reqwest::Client,
    limiter: RateLimiter,
    rpc_url: String,
    max_attempts: u32,
}

impl Transport {
    /// Create a transport over a shared HTTP client and rate limiter.
    pub fn new(
        http: reqwest::Client,
        limiter: RateLimiter,
        rpc_url: impl Into<String>,
        max_attempts: u32,
    ) -> Self {
        Self {
            http,
            limiter,
            rpc_url: rpc_url.into(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Execute one request, retrying per the backoff policy.
    ///
    /// `tag` names the operation in warnings and in the terminal
    /// [`SourceError::TransportExhausted`].
    pub async fn execute(&self, tag: &str, request: &SourceRequest) -> SourceResult<Value> {
        self.run_attempts(tag, || self.attempt_once(request)).await
    }

    /// The attempt loop, generic over the attempt body so the retry policy
    /// can be exercised without a live endpoint.
    async fn run_attempts<F, Fut>(&self, tag: &str, mut attempt: F) -> SourceResult<Value>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Value, AttemptError>>,
    {
        let mut last = String::from("no attempt made");
        for n in 1..=self.max_attempts {
            self.limiter.acquire().await;
            let rate_limited = match attempt().await {
                Ok(body) => return Ok(body),
                Err(AttemptError::RateLimited) => {
                    last = "HTTP 429".to_string();
                    true
                }
                Err(AttemptError::Transport(e)) => {
                    last = e;
                    false
                }
            };
            // No point waiting out a backoff we will never use.
            if n == self.max_attempts {
                break;
            }
            let wait = retry_delay(rate_limited, n);
            warn!(
                tag,
                attempt = n,
                error = %last,
                wait_secs = wait.as_secs_f64(),
                "source attempt failed, retrying"
            );
            sleep(wait).await;
        }
        Err(SourceError::TransportExhausted {
            tag: tag.to_string(),
            last,
        })
    }

    async fn attempt_once(&self, request: &SourceRequest) -> Result<Value, AttemptError> {
        let response = match request {
            SourceRequest::Rpc { method, params } => {
                let envelope = serde_json::json!({
                    "jsonrpc": "2.0",
                    "method": method,
                    "params": params,
                    "id": 1,
                });
                self.http.post(&self.rpc_url).json(&envelope).send().await
            }
            SourceRequest::Get { url } => self.http.get(url).send().await,
        }
        .map_err(|e| AttemptError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AttemptError::RateLimited);
        }

        let response = response
            .error_for_status()
            .map_err(|e| AttemptError::Transport(e.to_string()))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))
    }
}
