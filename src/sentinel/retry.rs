//! Fixed-interval retry policy shared by the enrichment queries.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;
use tracing::warn;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// `attempts` total tries with a fixed `delay` between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    attempts: usize,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `action` until it succeeds, fails terminally, or attempts run out.
    /// The last error is returned when giving up.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut action: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let strategy = FixedInterval::new(self.delay).take(self.attempts - 1);
        let attempt = AtomicUsize::new(0);
        let max_attempts = self.attempts;

        RetryIf::spawn(
            strategy,
            || {
                attempt.fetch_add(1, Ordering::Relaxed);
                action()
            },
            |error: &E| {
                let current = attempt.load(Ordering::Relaxed);
                let retry = error.is_retryable();
                if retry && current < max_attempts {
                    warn!(
                        "{} failed (attempt {}/{}), retrying: {}",
                        operation, current, max_attempts, error
                    );
                }
                retry
            },
        )
        .await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}
