//! Store calls with exponential backoff retry logic.
//!
//! Cloudant throttles bursts of inserts with `429 Too Many Requests`, and a
//! whole id range is inserted at once. [`RetryStore`] wraps any
//! [`DocumentStore`] and repeats calls that failed with a retriable error.
//!
//! # Retry Strategy
//!
//! - Configurable number of retry attempts
//! - Exponential backoff starting at `base_delay`
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//! - Only errors where [`StoreError::should_retry`] holds are repeated

use crate::errors::StoreError;
use crate::models::Fund;
use crate::outputs::{DocumentStore, InsertReceipt};
use rand::{Rng, rng};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Wrapper that adds exponential backoff retry logic to any [`DocumentStore`].
///
/// # Backoff Strategy
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryStore<S> {
    /// The underlying store to wrap.
    inner: S,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: Duration,
}

impl<S> RetryStore<S> {
    pub fn new(inner: S, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }

    async fn with_retry<T, F, Fut>(&self, op: &'static str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_attempt = attempt_t0.elapsed().as_millis();
                    let elapsed_ms_total = total_t0.elapsed().as_millis();

                    if !e.should_retry() || attempt > self.max_retries {
                        error!(
                            op,
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt,
                            elapsed_ms_total,
                            error = %e,
                            "Store call failed; giving up"
                        );
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        op,
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "Store call failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

impl<S> fmt::Debug for RetryStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryStore")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<S: DocumentStore> DocumentStore for RetryStore<S> {
    #[instrument(level = "info", skip_all)]
    async fn destroy(&self) -> Result<(), StoreError> {
        self.with_retry("destroy", || self.inner.destroy()).await
    }

    #[instrument(level = "info", skip_all)]
    async fn create(&self) -> Result<(), StoreError> {
        self.with_retry("create", || self.inner.create()).await
    }

    #[instrument(level = "debug", skip_all, fields(fund_id = %fund.id))]
    async fn insert(&self, fund: &Fund) -> Result<InsertReceipt, StoreError> {
        self.with_retry("insert", || self.inner.insert(fund)).await
    }
}
