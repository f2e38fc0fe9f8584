//! Serializable wait configuration
//!
//! Resource definitions describe their waiters declaratively (states and
//! timings in seconds); [`WaitConfig::into_options`] turns that into
//! [`Options`] for [`wait_for_status`](crate::wait_for_status).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::interval::FixedInterval;
use crate::options::Options;
use crate::status::Status;

/// Declarative polling policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Total wall-clock budget in seconds
    pub timeout_secs: u64,
    /// Fixed poll interval in seconds (30 when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    /// Minimum spacing between progress reports in seconds; only takes
    /// effect once a sink is attached with [`Options::with_progress_sink`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_interval_secs: Option<u64>,
    pub success_states: Vec<Status>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transitional_states: Vec<Status>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failure_states: Vec<Status>,
    /// Back-to-back success observations required (1 when 0)
    pub consecutive_success: u32,
}

impl WaitConfig {
    /// Build polling options; validation happens when the wait starts
    pub fn into_options(self) -> Options {
        let mut opts = Options::new(Duration::from_secs(self.timeout_secs))
            .with_success_states(self.success_states)
            .with_transitional_states(self.transitional_states)
            .with_failure_states(self.failure_states)
            .with_consecutive_success(self.consecutive_success);

        if let Some(secs) = self.interval_secs {
            opts = opts.with_interval(FixedInterval::new(Duration::from_secs(secs)));
        }
        if let Some(secs) = self.progress_interval_secs {
            opts.progress_interval = Duration::from_secs(secs);
        }
        opts
    }
}

/// Per-operation timeout overrides for a resource, in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceTimeouts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<u64>,
}

impl ResourceTimeouts {
    pub fn create_or(&self, default: Duration) -> Duration {
        Self::or(self.create, default)
    }

    pub fn read_or(&self, default: Duration) -> Duration {
        Self::or(self.read, default)
    }

    pub fn update_or(&self, default: Duration) -> Duration {
        Self::or(self.update, default)
    }

    pub fn delete_or(&self, default: Duration) -> Duration {
        Self::or(self.delete, default)
    }

    // zero means "not set"
    fn or(secs: Option<u64>, default: Duration) -> Duration {
        match secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => default,
        }
    }
}
