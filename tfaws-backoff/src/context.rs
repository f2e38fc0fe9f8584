//! Context - Cancellable execution context shared by retry and wait loops
//!
//! A Context couples a cancellation token with an optional absolute deadline.
//! Loops check it before issuing work and race it against every sleep.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::timer::Deadline;

/// Reason a Context is done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The context was cancelled by its owner (or an ancestor)
    #[error("context canceled")]
    Canceled,

    /// The context's own deadline has passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl ContextError {
    /// Returns true if the context was explicitly cancelled
    pub fn is_canceled(&self) -> bool {
        matches!(self, ContextError::Canceled)
    }

    /// Returns true if the context ran past its deadline
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, ContextError::DeadlineExceeded)
    }
}

/// Cancellable execution context
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Create a root context that is never done unless cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context driven by an existing cancellation token
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derive a child context: cancelling the parent cancels the child,
    /// cancelling the child leaves the parent untouched
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derive a child context that expires at `deadline` (or earlier, if the
    /// parent already has a sooner deadline)
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Derive a child context that expires `timeout` from now
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Deadline::after(timeout).instant())
    }

    /// Cancel this context and all of its children
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The underlying cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Absolute deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why the context is done, or None while it is still live
    ///
    /// Cancellation is reported ahead of an expired deadline.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Sleep for `duration` unless the context finishes first
    ///
    /// A zero duration returns immediately without yielding.
    pub async fn sleep(&self, duration: Duration) -> Result<(), ContextError> {
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.done() => Err(self.err().unwrap_or(ContextError::Canceled)),
        }
    }
}
