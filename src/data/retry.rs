use crate::config::InfrastructureConfig;
use crate::error::FeedError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &InfrastructureConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_backoff_ms),
            max_jitter: Duration::from_millis(config.retry_jitter_ms),
        }
    }

    /// Exponential backoff plus uniform jitter. `attempt` starts at 0.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        backoff + Duration::from_millis(jitter)
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// retry budget is spent.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, FeedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FeedError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{} failed ({}), retry {}/{} in {:?}",
                    what,
                    e,
                    attempt + 1,
                    policy.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Feed;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    fn server_error() -> FeedError {
        FeedError::Status {
            feed: Feed::Market,
            status: 503,
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast(3), "markets", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(server_error())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast(2), "markets", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(server_error()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast(5), "markets", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(FeedError::Status {
                    feed: Feed::Market,
                    status: 404,
                    body: String::new(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_bounds() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_jitter: Duration::from_millis(50),
        };
        for attempt in 0..3 {
            let backoff = 100 * 2u64.pow(attempt);
            let delay = policy.delay_for(attempt).as_millis() as u64;
            assert!(delay >= backoff && delay <= backoff + 50);
        }
    }
}
