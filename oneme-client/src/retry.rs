//! Retry policy for the raw-bytes HTTP upload step.
//!
//! This is deliberately distinct from reconnection, which uses a fixed delay:
//! the push channel is expected to recover fast, while upload endpoints back
//! off exponentially.  Only transient failures (5xx, connect/timeout) are
//! retried; 4xx responses never are.

use std::num::NonZeroU32;
use std::ops::ControlFlow;
use std::time::Duration;

use crate::errors::Error;

/// Controls how the client reacts when an HTTP upload attempt fails.
pub trait UploadRetryPolicy: Send + Sync + 'static {
    fn should_retry(&self, ctx: &RetryContext) -> ControlFlow<(), Duration>;
}

/// Context passed to [`UploadRetryPolicy::should_retry`] on each failure.
pub struct RetryContext {
    pub fail_count:   NonZeroU32,
    pub slept_so_far: Duration,
    pub error:        Error,
}

/// Never retry.
pub struct NoRetries;
impl UploadRetryPolicy for NoRetries {
    fn should_retry(&self, _: &RetryContext) -> ControlFlow<(), Duration> {
        ControlFlow::Break(())
    }
}

/// Doubling backoff with a delay cap and an attempt limit.
pub struct ExponentialBackoff {
    pub max_attempts:  u32,
    pub initial_delay: Duration,
    pub max_delay:     Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            max_attempts:  3,
            initial_delay: Duration::from_secs(1),
            max_delay:     Duration::from_secs(30),
        }
    }
}

impl UploadRetryPolicy for ExponentialBackoff {
    fn should_retry(&self, ctx: &RetryContext) -> ControlFlow<(), Duration> {
        if !ctx.error.is_retryable() || ctx.fail_count.get() >= self.max_attempts {
            return ControlFlow::Break(());
        }
        let exp   = ctx.fail_count.get().saturating_sub(1).min(20);
        let delay = self
            .initial_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay);
        log::info!("[oneme] Upload attempt {} failed — retrying in {:?}", ctx.fail_count, delay);
        ControlFlow::Continue(delay)
    }
}
