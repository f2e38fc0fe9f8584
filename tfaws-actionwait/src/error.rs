//! Error taxonomy of the polling core and predicates over it
//!
//! The predicates walk `source()` chains, look inside [`WaitError`],
//! [`WaitFailure`] and [`JoinedError`], and so see through `anyhow` context
//! and `#[source]` wrapping. They never inspect error messages: an error
//! that only repeats another error's text is not a match.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use tfaws_backoff::ContextError;
use thiserror::Error;

use crate::options::ConfigError;
use crate::result::FetchResult;
use crate::status::{Status, format_states};

/// Boxed error returned by fetch operations
pub type BoxError = Box<dyn Error + Send + Sync>;

/// The wait ran out of time before reaching a success or failure state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("timeout after {timeout:?} waiting for status (last status: '{last_status}')")]
pub struct TimeoutError {
    pub last_status: Status,
    pub timeout: Duration,
}

/// The resource reported one of the configured failure states
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("resource entered failure state '{status}'")]
pub struct FailureStateError {
    pub status: Status,
}

/// The resource reported a status outside every configured set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected state '{status}', wanted one of: {}", format_states(.allowed))]
pub struct UnexpectedStateError {
    pub status: Status,
    pub allowed: Vec<Status>,
}

/// Any reason a status wait can end without success
#[derive(Debug, Error)]
pub enum WaitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error(transparent)]
    FailureState(#[from] FailureStateError),

    #[error(transparent)]
    UnexpectedState(#[from] UnexpectedStateError),

    /// The fetch operation itself failed; passed through untouched
    #[error(transparent)]
    Fetch(BoxError),

    /// The caller's context was cancelled or hit its own deadline
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl WaitError {
    pub fn fetch(err: impl Into<BoxError>) -> Self {
        WaitError::Fetch(err.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout(_))
    }

    pub fn is_failure_state(&self) -> bool {
        matches!(self, WaitError::FailureState(_))
    }

    pub fn is_unexpected_state(&self) -> bool {
        matches!(self, WaitError::UnexpectedState(_))
    }

    /// Returns true for cancellation or an expired caller deadline
    pub fn is_context(&self) -> bool {
        matches!(self, WaitError::Context(_))
    }
}

/// A failed wait together with the last result observed before it ended
///
/// `last` is `None` when no fetch completed (validation errors, a fetch
/// error on the first attempt, or cancellation before the first fetch).
#[derive(Debug)]
pub struct WaitFailure<T> {
    pub error: WaitError,
    pub last: Option<FetchResult<T>>,
}

impl<T> WaitFailure<T> {
    pub fn new(error: WaitError, last: Option<FetchResult<T>>) -> Self {
        Self { error, last }
    }

    pub fn error(&self) -> &WaitError {
        &self.error
    }

    pub fn into_error(self) -> WaitError {
        self.error
    }

    pub fn into_parts(self) -> (WaitError, Option<FetchResult<T>>) {
        (self.error, self.last)
    }
}

impl<T> fmt::Display for WaitFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T: fmt::Debug> Error for WaitFailure<T> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

impl<T> From<WaitFailure<T>> for WaitError {
    fn from(failure: WaitFailure<T>) -> Self {
        failure.error
    }
}

/// Several errors reported as one
#[derive(Debug)]
pub struct JoinedError {
    errors: Vec<BoxError>,
}

impl JoinedError {
    pub fn errors(&self) -> impl Iterator<Item = &(dyn Error + Send + Sync + 'static)> {
        self.errors.iter().map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for JoinedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl Error for JoinedError {}

/// Join errors into one; returns None when there are none
pub fn join_errors<I, E>(errors: I) -> Option<JoinedError>
where
    I: IntoIterator<Item = E>,
    E: Into<BoxError>,
{
    let errors: Vec<BoxError> = errors.into_iter().map(Into::into).collect();
    if errors.is_empty() {
        None
    } else {
        Some(JoinedError { errors })
    }
}

/// Returns true if `err` is, or structurally wraps, a [`TimeoutError`]
pub fn is_timeout(err: &(dyn Error + 'static)) -> bool {
    find(err, &|e| {
        e.is::<TimeoutError>() || e.downcast_ref::<WaitError>().is_some_and(WaitError::is_timeout)
    })
}

/// Returns true if `err` is, or structurally wraps, a [`FailureStateError`]
pub fn is_failure_state(err: &(dyn Error + 'static)) -> bool {
    find(err, &|e| {
        e.is::<FailureStateError>()
            || e.downcast_ref::<WaitError>()
                .is_some_and(WaitError::is_failure_state)
    })
}

/// Returns true if `err` is, or structurally wraps, an [`UnexpectedStateError`]
pub fn is_unexpected_state(err: &(dyn Error + 'static)) -> bool {
    find(err, &|e| {
        e.is::<UnexpectedStateError>()
            || e.downcast_ref::<WaitError>()
                .is_some_and(WaitError::is_unexpected_state)
    })
}

fn find(err: &(dyn Error + 'static), matches: &dyn Fn(&(dyn Error + 'static)) -> bool) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if matches(e) {
            return true;
        }
        if let Some(joined) = e.downcast_ref::<JoinedError>()
            && joined.errors().any(|inner| find(inner, matches))
        {
            return true;
        }
        // transparent variant: its source() skips the boxed error itself
        if let Some(WaitError::Fetch(inner)) = e.downcast_ref::<WaitError>()
            && find(inner.as_ref(), matches)
        {
            return true;
        }
        current = e.source();
    }
    false
}
