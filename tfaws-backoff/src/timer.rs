//! Timer - Clock and sleep abstraction used by retry loops

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

/// Source of the current time and of sleeps
///
/// The default implementation uses the tokio clock. Tests substitute a
/// manual clock to run loops without waiting in real time.
#[async_trait]
pub trait Timer: Send + Sync + fmt::Debug {
    /// Current instant according to this timer
    fn now(&self) -> Instant;

    /// Wait for `duration` to elapse
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock timer backed by `tokio::time`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Stand-in for "no deadline" when `start + timeout` does not fit in an Instant
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// An absolute point in time after which work should stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `timeout` after `start`, capped roughly 30 years out
    pub fn new(start: Instant, timeout: Duration) -> Self {
        Self {
            at: start + timeout.min(FAR_FUTURE),
        }
    }

    /// Deadline `timeout` from now on the tokio clock
    pub fn after(timeout: Duration) -> Self {
        Self::new(Instant::now(), timeout)
    }

    /// The absolute instant
    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Time left as seen from `now`, floored at zero
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.at.saturating_duration_since(now)
    }

    /// Time left on the tokio clock, floored at zero
    pub fn remaining(&self) -> Duration {
        self.remaining_at(Instant::now())
    }
}
