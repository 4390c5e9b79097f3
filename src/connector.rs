//! # Upstream Connector
//!
//! Establishes the upstream HTTP connection for a request, retrying rate
//! limited connection attempts with capped exponential backoff. Retrying is
//! confined to the phase before any response body byte exists: once
//! [`connect`] returns a response, failures while reading its body belong
//! to the stream relay's error path, because a replay at that point would
//! duplicate content already delivered to the client.

use crate::error::ProxyError;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded backoff budget for the connection phase.
#[derive(Debug, Clone, Copy)]
pub struct RetryBudget {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryBudget {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            max_attempts: config.connect_max_attempts.max(1),
            base_delay: Duration::from_millis(config.connect_base_delay_ms),
            max_delay: Duration::from_millis(config.connect_max_delay_ms),
        }
    }

    /// Delay before the retry following failed attempt number `attempt`
    /// (zero-based): `min(max_delay, base_delay * 2^attempt)` plus up to 25%
    /// jitter to spread synchronized clients.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.min(16);
        let exp = self
            .base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay);
        let jitter_ceiling = (exp.as_millis() as u64 / 4).max(1);
        exp + Duration::from_millis(fastrand::u64(0..jitter_ceiling))
    }
}

/// Send `request`, retrying on HTTP 429 within `budget`.
///
/// Non-429 error statuses and transport failures are returned immediately;
/// only rate limiting marks an attempt as retryable. Exhausting the budget
/// yields [`ProxyError::RateLimited`].
pub async fn connect(request: RequestBuilder, budget: RetryBudget) -> Result<Response, ProxyError> {
    let mut attempt: u32 = 0;
    loop {
        let this_attempt = request
            .try_clone()
            .ok_or_else(|| ProxyError::Internal("upstream request body is not replayable".to_string()))?;

        let response = this_attempt.send().await.map_err(ProxyError::from)?;
        let status = response.status();
        attempt += 1;

        if status == StatusCode::TOO_MANY_REQUESTS {
            if attempt >= budget.max_attempts {
                warn!(attempts = attempt, "upstream rate limit persisted, giving up");
                return Err(ProxyError::RateLimited { attempts: attempt });
            }
            let delay = budget.delay_for(attempt - 1);
            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "upstream rate limited during connect, backing off"
            );
            tokio::time::sleep(delay).await;
            continue;
        }

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProxyError::UpstreamStatus {
                status: status.as_u16(),
                detail,
            });
        }

        return Ok(response);
    }
}
