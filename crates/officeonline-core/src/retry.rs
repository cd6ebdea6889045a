use crate::error::{CoreError, CoreResult};
use std::time::Duration;

/// Bounded polling: at most `attempts` probes, `delay` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_millis(100),
        }
    }
}

/// Polls `probe` until it yields a value or the policy runs out, e.g. while
/// waiting for a toolbar or preview element to appear.
pub async fn poll_until<T, F>(what: &str, policy: RetryPolicy, mut probe: F) -> CoreResult<T>
where
    F: FnMut() -> Option<T>,
{
    for attempt in 1..=policy.attempts {
        if let Some(found) = probe() {
            return Ok(found);
        }
        if attempt < policy.attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }
    tracing::warn!(what, attempts = policy.attempts, "gave up waiting");
    Err(CoreError::RetryExhausted {
        what: what.to_string(),
        attempts: policy.attempts,
    })
}
