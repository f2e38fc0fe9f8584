//! Fetch results and progress snapshots

use std::any::Any;
use std::time::Duration;

use tokio::time::Instant;

use crate::status::Status;

/// Outcome of one poll: the observed status plus a caller-defined payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult<T> {
    pub status: Status,
    pub value: T,
}

impl<T> FetchResult<T> {
    pub fn new(status: impl Into<Status>, value: T) -> Self {
        Self {
            status: status.into(),
            value,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T: Any> FetchResult<T> {
    /// Borrow this result with its payload type erased
    pub fn erased(&self) -> AnyFetchResult<'_> {
        AnyFetchResult {
            status: &self.status,
            value: &self.value,
        }
    }
}

/// Type-erased view of a [`FetchResult`] handed to progress callbacks
#[derive(Debug, Clone, Copy)]
pub struct AnyFetchResult<'a> {
    status: &'a Status,
    value: &'a dyn Any,
}

impl<'a> AnyFetchResult<'a> {
    pub fn status(&self) -> &'a Status {
        self.status
    }

    pub fn value(&self) -> &'a dyn Any {
        self.value
    }

    /// The payload, if it is a `U`
    pub fn downcast_ref<U: Any>(&self) -> Option<&'a U> {
        self.value.downcast_ref::<U>()
    }
}

/// Snapshot passed along with each progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressMeta {
    /// 0-based attempt that produced the reported result
    pub attempt: u32,
    /// Time since the wait started
    pub elapsed: Duration,
    /// Time until the deadline, floored at zero
    pub remaining: Duration,
    /// Absolute deadline of the wait
    pub deadline: Instant,
    /// Delay before the next fetch
    pub next_poll: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erased_result_downcasts_to_payload_type() {
        let result = FetchResult::new("AVAILABLE", 42_i64);
        let erased = result.erased();

        assert_eq!(erased.status(), "AVAILABLE");
        assert_eq!(erased.downcast_ref::<i64>(), Some(&42));
        assert!(erased.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_unit_payload() {
        let result = FetchResult::new("DONE", ());
        assert!(result.erased().value().is::<()>());
        result.into_value();
    }
}
