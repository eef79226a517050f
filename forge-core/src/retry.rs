//! Bounded exponential backoff for upstream calls.
//!
//! LLM and data-store calls retry up to 3 times with exponential backoff
//! starting at 500 ms, capped at 8 s, with jitter. Subprocess validators are
//! never retried; their callers use the degraded-mode path instead.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{ForgeError, ForgeResult};

/// Retry schedule for transient upstream failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling for any single delay.
    pub max_delay: Duration,
    /// Add up to 25% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// No retries at all. Used by subprocess validators.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (1-based), without jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        let raw = self.base_delay.saturating_mul(1u32 << exp);
        raw.min(self.max_delay)
    }

    fn jittered(&self, base: Duration) -> Duration {
        if !self.jitter {
            return base;
        }
        // Cheap jitter from the clock's sub-millisecond noise; this only has
        // to decorrelate concurrent retries, not be uniform.
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let frac = (nanos % 1000) as f64 / 1000.0;
        base + base.mul_f64(0.25 * frac)
    }
}

/// Run `op` under the policy, retrying only on errors that report
/// [`ForgeError::retryable`]. A rate-limited response that carries a
/// `retry_after` hint longer than our next backoff uses the hint instead.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, op_name: &str, mut op: F) -> ForgeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ForgeResult<T>>,
{
    let mut last_err: Option<ForgeError> = None;

    for attempt in 1..=policy.max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.retryable() && attempt < policy.max_attempts => {
                let mut delay = policy.jittered(policy.delay_for(attempt));
                if let Some(hint) = e.retry_after() {
                    delay = delay.max(Duration::from_secs(hint).min(policy.max_delay));
                }
                warn!(
                    op = op_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient upstream failure, backing off"
                );
                tokio::time::sleep(delay).await;
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        ForgeError::InternalInvariant(format!("retry loop for '{op_name}' exited without error"))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn no_jitter() -> RetryPolicy {
        RetryPolicy {
            jitter: false,
            base_delay: Duration::from_millis(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_backoff_schedule_doubles_and_caps() {
        let policy = RetryPolicy {
            jitter: false,
            ..Default::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(5), Duration::from_secs(8));
        assert_eq!(policy.delay_for(12), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = with_retry(&no_jitter(), "test", move || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ForgeError::UpstreamUnavailable("503".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: ForgeResult<()> = with_retry(&no_jitter(), "test", move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(ForgeError::InvalidInput("bad".into()))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let result: ForgeResult<()> = with_retry(&no_jitter(), "test", || async {
            Err(ForgeError::UpstreamUnavailable("502".into()))
        })
        .await;
        match result {
            Err(ForgeError::UpstreamUnavailable(msg)) => assert_eq!(msg, "502"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
