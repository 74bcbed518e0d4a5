//! HTTP retry for throttled and transiently failing Graph requests.
//!
//! Graph rate-limits aggressively under version-history bursts (one request
//! per strategy probe plus the version listing). 429 and 5xx responses are
//! retried with exponential backoff and jitter; a numeric `Retry-After`
//! header takes precedence over the computed delay. 4xx responses other
//! than 429 pass straight through to classification.

use reqwest::{Client, Request, Response};
use std::time::Duration;

/// Retry tuning.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial request.
    pub max_retries: u32,
    /// Base backoff delay in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on a single computed delay.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 20_000,
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Numeric `Retry-After` seconds, capped at two minutes. The HTTP-date form
/// is rare enough on Graph that it falls back to computed backoff.
fn retry_after(response: &Response) -> Option<Duration> {
    let value = response.headers().get("retry-after")?.to_str().ok()?;
    let secs: u64 = value.trim().parse().ok()?;
    Some(Duration::from_secs(secs.min(120)))
}

fn backoff_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base = config.base_delay_ms.saturating_mul(1u64 << attempt.min(16));
    let capped = base.min(config.max_delay_ms);
    // 0-25% jitter spreads concurrent clients apart.
    let jitter = (capped as f64 * rand::random::<f64>() * 0.25) as u64;
    Duration::from_millis(capped + jitter)
}

/// Execute a request, retrying 429/5xx responses.
///
/// The request is cloned per attempt; a request whose body cannot be
/// replayed (streaming) is executed exactly once.
pub async fn send_with_retry(
    client: &Client,
    request: Request,
    config: &RetryConfig,
) -> Result<Response, reqwest::Error> {
    let mut attempt = 0u32;
    loop {
        let attempt_request = match request.try_clone() {
            Some(r) => r,
            None => return client.execute(request).await,
        };

        let response = client.execute(attempt_request).await?;
        let status = response.status().as_u16();
        if attempt >= config.max_retries || !is_retryable_status(status) {
            return Ok(response);
        }

        let delay = retry_after(&response).unwrap_or_else(|| backoff_delay(attempt, config));
        tracing::debug!(
            "graph {} {} returned {}, retry {}/{} in {:?}",
            request.method(),
            request.url(),
            status,
            attempt + 1,
            config.max_retries,
            delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(200));
        assert!(!is_retryable_status(403));
        assert!(!is_retryable_status(404));
    }

    #[test]
    fn test_backoff_delay_bounded() {
        let config = RetryConfig::default();
        for attempt in 0..20 {
            let delay = backoff_delay(attempt, &config);
            assert!(delay.as_millis() <= (config.max_delay_ms as u128 * 5 / 4));
        }
    }

    #[test]
    fn test_backoff_delay_grows() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 60_000,
        };
        // Jitter is at most 25%, so consecutive doublings stay ordered.
        assert!(backoff_delay(3, &config) > backoff_delay(0, &config));
    }
}
