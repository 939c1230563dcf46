use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Default pause between reconnection attempts
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 100;

/// Decides how long to wait between attempts to re-establish a connection
pub trait ReconnectionPolicy: Debug + Send + Sync {
    /// Delay to wait before the given reconnection attempt (1-based)
    fn next_delay(&self, attempt: u32) -> Duration;

    /// Upper bound on attempts; `None` keeps trying until the operation succeeds
    fn max_attempts(&self) -> Option<u32> {
        None
    }
}

/// Reconnect at a fixed interval, forever unless capped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantReconnectionPolicy {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl ConstantReconnectionPolicy {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    pub fn from_millis(delay_ms: u64) -> Self {
        Self::new(Duration::from_millis(delay_ms))
    }

    /// Give up after `max_attempts` failed attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for ConstantReconnectionPolicy {
    fn default() -> Self {
        Self::from_millis(DEFAULT_RECONNECT_DELAY_MS)
    }
}

impl ReconnectionPolicy for ConstantReconnectionPolicy {
    fn next_delay(&self, _attempt: u32) -> Duration {
        self.delay
    }

    fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }
}

/// Run `operation` until it succeeds, sleeping between failures as the policy dictates
///
/// Returns the last error only when the policy has a cap and it was reached.
///
/// # Example
/// ```ignore
/// use database::common::{ConstantReconnectionPolicy, reconnect_with_policy};
///
/// let policy = ConstantReconnectionPolicy::from_millis(100);
/// let session = reconnect_with_policy(|| connect_from_config(&config), &policy).await?;
/// ```
pub async fn reconnect_with_policy<F, Fut, T, E>(
    mut operation: F,
    policy: &dyn ReconnectionPolicy,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(attempts = attempt + 1, "Reconnected");
                }
                return Ok(result);
            }
            Err(e) => {
                attempt += 1;

                if let Some(max) = policy.max_attempts()
                    && attempt >= max
                {
                    warn!(attempts = attempt, error = %e, "Giving up reconnecting");
                    return Err(e);
                }

                let delay = policy.next_delay(attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Connection attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
