//! Options - Declarative policy for one status-polling session

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::interval::{FixedInterval, IntervalStrategy};
use crate::result::{AnyFetchResult, ProgressMeta};
use crate::status::{Status, status_list};

/// Callback receiving throttled progress updates
pub type ProgressSink = Box<dyn FnMut(&AnyFetchResult<'_>, &ProgressMeta) + Send>;

/// Invalid polling configuration, reported before the first fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("timeout must be greater than zero")]
    MissingTimeout,

    #[error("at least one success state is required")]
    NoSuccessStates,
}

/// Configuration for [`wait_for_status`](crate::wait_for_status)
///
/// - `failure_states` take precedence over `success_states`
/// - an empty `transitional_states` lets any other status keep polling
/// - `consecutive_success` of 0 means 1
/// - a zero `progress_interval` disables progress reporting
pub struct Options {
    pub timeout: Duration,
    pub interval: Option<Box<dyn IntervalStrategy>>,
    pub progress_interval: Duration,
    pub success_states: Vec<Status>,
    pub transitional_states: Vec<Status>,
    pub failure_states: Vec<Status>,
    pub consecutive_success: u32,
    pub progress_sink: Option<ProgressSink>,
}

impl Options {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: None,
            progress_interval: Duration::ZERO,
            success_states: Vec::new(),
            transitional_states: Vec::new(),
            failure_states: Vec::new(),
            consecutive_success: 0,
            progress_sink: None,
        }
    }

    pub fn with_interval(mut self, interval: impl IntervalStrategy + 'static) -> Self {
        self.interval = Some(Box::new(interval));
        self
    }

    pub fn with_success_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Status>,
    {
        self.success_states = status_list(states);
        self
    }

    pub fn with_transitional_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Status>,
    {
        self.transitional_states = status_list(states);
        self
    }

    pub fn with_failure_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Status>,
    {
        self.failure_states = status_list(states);
        self
    }

    /// Number of back-to-back success observations required
    pub fn with_consecutive_success(mut self, count: u32) -> Self {
        self.consecutive_success = count;
        self
    }

    /// Report progress through `sink` at most once per `interval`
    pub fn with_progress<F>(mut self, interval: Duration, sink: F) -> Self
    where
        F: FnMut(&AnyFetchResult<'_>, &ProgressMeta) + Send + 'static,
    {
        self.progress_interval = interval;
        self.with_progress_sink(sink)
    }

    /// Install a progress sink, keeping the current `progress_interval`
    pub fn with_progress_sink<F>(mut self, sink: F) -> Self
    where
        F: FnMut(&AnyFetchResult<'_>, &ProgressMeta) + Send + 'static,
    {
        self.progress_sink = Some(Box::new(sink));
        self
    }

    /// Check the configuration without applying defaults
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::MissingTimeout);
        }
        if self.success_states.is_empty() {
            return Err(ConfigError::NoSuccessStates);
        }
        Ok(())
    }

    /// The configured interval strategy, or a fixed 30s interval
    pub(crate) fn take_interval(&mut self) -> Box<dyn IntervalStrategy> {
        self.interval
            .take()
            .unwrap_or_else(|| Box::new(FixedInterval::default()))
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("timeout", &self.timeout)
            .field("interval", &self.interval.as_ref().map(|_| ".."))
            .field("progress_interval", &self.progress_interval)
            .field("success_states", &self.success_states)
            .field("transitional_states", &self.transitional_states)
            .field("failure_states", &self.failure_states)
            .field("consecutive_success", &self.consecutive_success)
            .field("progress_sink", &self.progress_sink.is_some())
            .finish()
    }
}
