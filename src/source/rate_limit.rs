//! Global request-rate gate
//!
//! One limiter instance is shared by every outbound call in a run. It
//! enforces a minimum interval between grants with a small random jitter to
//! desynchronize concurrent league pipelines.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Floor applied when a non-positive qps is configured.
/// One request every ten seconds still makes progress without ever
/// dividing by zero.
const QPS_FLOOR: f64 = 0.1;

/// Minimum-interval rate limiter with symmetric jitter.
///
/// `acquire()` is a gate, not a queue: grant decisions are serialized
/// through a short critical section, but the waiting itself happens outside
/// it, so one caller's sleep never delays another caller's grant decision.
#[derive(Clone)]
pub struct RateLimiter {
    next_grant: Arc<Mutex<Instant>>,
    min_interval: Duration,
    jitter: f64,
}

impl RateLimiter {
    /// Create a limiter targeting `qps` requests per second with a
    /// symmetric jitter fraction (e.g. 0.125 for ±12.5%).
    pub fn new(qps: f64, jitter: f64) -> Self {
        let qps = if qps > 0.0 { qps } else { QPS_FLOOR };
        Self {
            next_grant: Arc::new(Mutex::new(Instant::now())),
            min_interval: Duration::from_secs_f64(1.0 / qps),
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    /// The configured minimum inter-request interval.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Block until at least the minimum interval has elapsed since the
    /// previous grant, then return.
    pub async fn acquire(&self) {
        let grant_at = {
            let mut next = self.next_grant.lock().await;
            let now = Instant::now();
            let grant_at = (*next).max(now);
            *next = grant_at + self.jittered_interval();
            grant_at
        };
        sleep_until(grant_at).await;
    }

    fn jittered_interval(&self) -> Duration {
        if self.jitter == 0.0 {
            return self.min_interval;
        }
        let factor = rand::thread_rng().gen_range(1.0 - self.jitter..=1.0 + self.jitter);
        self.min_interval.mul_f64(factor)
    }
}
