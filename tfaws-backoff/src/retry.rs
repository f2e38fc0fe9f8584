//! Retry an operation while its errors are classified as retryable
//!
//! Typical uses are IAM eventual consistency ("role cannot be assumed")
//! and API throttling, where the same call succeeds after a short wait.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::context::{Context, ContextError};
use crate::retry_loop::{Loop, LoopConfig};

/// Why [`retry_when`] gave up
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The operation failed with an error that is not retryable
    #[error("{0}")]
    Operation(E),

    /// Retries were exhausted; `last` holds the final retryable error
    #[error("timeout while retrying after {timeout:?}")]
    TimedOut {
        timeout: Duration,
        #[source]
        last: Option<E>,
    },

    /// The context was cancelled or expired
    #[error(transparent)]
    Cancelled(#[from] ContextError),
}

impl<E> RetryError<E> {
    /// Returns true if retries ran out of time
    pub fn is_timed_out(&self) -> bool {
        matches!(self, RetryError::TimedOut { .. })
    }

    /// The underlying operation error, if there is one
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            RetryError::Operation(e) => Some(e),
            RetryError::TimedOut { last, .. } => last,
            RetryError::Cancelled(_) => None,
        }
    }
}

/// Call `op` until it succeeds, fails with a non-retryable error, the
/// context is done, or `timeout` (plus the default grace period) elapses
pub async fn retry_when<T, E, F, Fut, P>(
    ctx: &Context,
    timeout: Duration,
    op: F,
    is_retryable: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E) -> bool,
{
    retry_when_with_config(ctx, timeout, LoopConfig::default(), op, is_retryable).await
}

/// [`retry_when`] with an explicit loop configuration
pub async fn retry_when_with_config<T, E, F, Fut, P>(
    ctx: &Context,
    timeout: Duration,
    config: LoopConfig,
    mut op: F,
    mut is_retryable: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E) -> bool,
{
    let mut lp = Loop::with_config(timeout, config);
    let mut last = None;

    while lp.proceed(ctx).await {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retryable(&err) => {
                log::debug!("retryable error on attempt {}", lp.attempt());
                last = Some(err);
            }
            Err(err) => return Err(RetryError::Operation(err)),
        }
    }

    if let Some(err) = ctx.err() {
        return Err(RetryError::Cancelled(err));
    }
    Err(RetryError::TimedOut { timeout, last })
}
