//! Fixed-delay, bounded-attempt retry shared by the image API client, the
//! cache store factory and the search-backend log hook.
//!
//! Unlike the usual exponential policy there is no growth and no jitter: every
//! attempt waits the same delay and the budget is a plain attempt count. When
//! the budget is spent, every attempt's failure is handed back, not only the
//! last one.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::future::retry_notify;
use tracing::debug;

/// Delay and attempt budget, built once from configuration and shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
    max_attempts: u32,
}

impl RetryPolicy {
    /// A zero attempt budget is raised to one: the operation always runs.
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_secs(delay_secs: u64, max_attempts: u32) -> Self {
        Self::new(Duration::from_secs(delay_secs), max_attempts)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn backoff(&self) -> FixedAttempts {
        FixedAttempts {
            delay: self.delay,
            max_attempts: self.max_attempts,
            attempts: 1,
        }
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    pub async fn execute<T, E, Op, Fut>(&self, mut operation: Op) -> Result<T, RetryExhausted<E>>
    where
        E: fmt::Display,
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut failures: Vec<E> = Vec::new();

        let result = retry_notify(
            self.backoff(),
            || {
                let attempt = operation();
                async move { attempt.await.map_err(backoff::Error::transient) }
            },
            |err: E, wait: Duration| {
                debug!(
                    error = %err,
                    retry_after_ms = wait.as_millis() as u64,
                    "Retry scheduled"
                );
                failures.push(err);
            },
        )
        .await;

        result.map_err(|last| {
            failures.push(last);
            RetryExhausted { failures }
        })
    }
}

/// Every failure from a retried operation, oldest first.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub failures: Vec<E>,
}

impl<E> RetryExhausted<E> {
    pub fn attempts(&self) -> usize {
        self.failures.len()
    }
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} attempt(s) failed: ", self.failures.len())?;
        for (index, failure) in self.failures.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "attempt {}: {failure}", index + 1)?;
        }
        Ok(())
    }
}

impl<E: fmt::Display + fmt::Debug> std::error::Error for RetryExhausted<E> {}

/// Constant delay that stops after `max_attempts` total attempts.
#[derive(Debug, Clone)]
struct FixedAttempts {
    delay: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl Backoff for FixedAttempts {
    fn reset(&mut self) {
        self.attempts = 1;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.delay)
    }
}
