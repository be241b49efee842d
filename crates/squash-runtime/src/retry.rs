//! Bounded retry policy with exponential backoff.
//!
//! One policy component for every retried operation; today that is
//! container creation, but the shape is phase-agnostic.

use std::time::Duration;

use futures_util::future::BoxFuture;
use tracing::warn;

/// Outcome of one failed attempt: the id of a partially created
/// resource to clean up, if any, plus the error text.
pub type AttemptError = (Option<String>, String);

/// Retry policy: total attempts and backoff between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay for exponential backoff (doubles each attempt).
    pub base_delay: Duration,
    /// Cap on the delay between attempts.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Set the total number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the base delay for exponential backoff.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay to sleep after the given failed attempt (1-based).
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(2u32.pow(exp));
        delay.min(self.max_delay)
    }

    /// Drive `attempt` under this policy. A failed attempt may leave a
    /// partial resource behind; its id is handed to `cleanup` before the
    /// backoff sleep. After exhaustion returns the attempt count and the
    /// last error text.
    pub async fn run<'a, T>(
        &self,
        mut attempt: impl FnMut(u32) -> BoxFuture<'a, Result<T, AttemptError>>,
        mut cleanup: impl FnMut(String) -> BoxFuture<'a, ()>,
    ) -> Result<T, (u32, String)> {
        let mut last_error = String::new();

        for n in 1..=self.max_attempts {
            match attempt(n).await {
                Ok(value) => return Ok(value),
                Err((partial, error)) => {
                    warn!(attempt = n, %error, "attempt failed");
                    if let Some(id) = partial {
                        cleanup(id).await;
                    }
                    last_error = error;

                    if n < self.max_attempts {
                        tokio::time::sleep(self.delay_after_attempt(n)).await;
                    }
                }
            }
        }

        Err((self.max_attempts, last_error))
    }
}
