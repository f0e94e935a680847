use std::fmt::Display;
use std::time::Duration;

use tracing::debug;

/// How many times an operation is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// A policy with at least one attempt; `attempts == 0` is treated as 1.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// Runs `operation` until it succeeds or the policy's attempts are used up.
///
/// The closure receives the 1-based attempt number. The first success is
/// returned immediately; otherwise the error of the final attempt is
/// returned. Earlier errors are only logged. The operation must be safe to
/// repeat, nothing is rolled back between attempts.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= policy.attempts => return Err(err),
            Err(err) => {
                debug!("Attempt {}/{} failed: {}", attempt, policy.attempts, err);
                if !policy.delay.is_zero() {
                    compio::time::sleep(policy.delay).await;
                }
                attempt += 1;
            }
        }
    }
}
