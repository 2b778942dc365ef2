//! Unbounded retry with randomized exponential backoff.

use backon::{ExponentialBuilder, Retryable};
use std::{fmt::Display, future::Future, time::Duration};
use tracing::warn;

/// How failed network calls are retried. Attempts are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Upper bound of the delay between attempts.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { min_delay: Duration::from_secs(1), max_delay: Duration::from_secs(60 * 60) }
    }
}

impl RetryPolicy {
    /// The backoff schedule: doubling delays with jitter, capped at `max_delay`, forever.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_jitter()
            .without_max_times()
    }

    /// Runs `op` until it succeeds, logging every failure.
    ///
    /// The schedule never runs out, so an error is only returned if the backoff gives up, which
    /// it does not.
    pub async fn retry<T, E, F, Fut>(&self, what: &str, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.retry_notify(what, op, |_| {}).await
    }

    /// Like [`Self::retry`], calling `on_failure` before each retry.
    pub async fn retry_notify<T, E, F, Fut>(
        &self,
        what: &str,
        op: F,
        mut on_failure: impl FnMut(&E),
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        op.retry(self.backoff())
            .sleep(tokio::time::sleep)
            .notify(|err: &E, delay: Duration| {
                warn!(target: "relay", %err, retry_in = ?delay, "{what} failed");
                on_failure(err);
            })
            .await
    }
}
