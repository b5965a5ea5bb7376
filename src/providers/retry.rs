// Exponential-backoff retry for provider calls

use anyhow::Result;
use std::time::Duration;
use tokio::time::sleep;

/// Backoff schedule for a retried provider call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Run `f` until it succeeds or the policy is exhausted, doubling the delay
/// between attempts. `operation` names the call in the retry warnings.
pub async fn with_retry<F, Fut, T>(operation: &str, policy: RetryPolicy, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                attempt += 1;
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "request failed, retrying in {delay:?}"
                );
                sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
