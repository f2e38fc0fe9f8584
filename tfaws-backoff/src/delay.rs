//! Delay strategies: how long to wait before the Nth attempt

use std::time::Duration;

/// Computes the delay to apply before a given attempt (0-based)
///
/// Implementations may carry state between calls, so callers must invoke
/// them in increasing attempt order within a single session.
pub trait Delay: Send {
    fn delay(&mut self, attempt: u32) -> Duration;
}

impl<F> Delay for F
where
    F: FnMut(u32) -> Duration + Send,
{
    fn delay(&mut self, attempt: u32) -> Duration {
        self(attempt)
    }
}

/// Constant delay, except that the first attempt never waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Delay for FixedDelay {
    fn delay(&mut self, attempt: u32) -> Duration {
        if attempt == 0 { Duration::ZERO } else { self.delay }
    }
}

/// Shorthand for [`FixedDelay::new`]
pub fn fixed_delay(delay: Duration) -> FixedDelay {
    FixedDelay::new(delay)
}

/// Starting value of the doubling accumulator
const INITIAL_WAIT: Duration = Duration::from_millis(100);

/// Upper clamp for the doubled wait
const MAX_WAIT: Duration = Duration::from_secs(10);

/// Poll-interval overrides at or above this are ignored
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(180);

/// Minimum wait used by the default SDK-compatible delay
pub const DEFAULT_MIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Doubling delay that reproduces the legacy plugin SDK state-change timing
///
/// Attempt 0 returns `initial_delay`. Every later call doubles the previous
/// wait (starting from 100ms) and then either pins it to `poll_interval`,
/// when that lies strictly between 0 and 180s, or clamps it into
/// `[min_timeout, 10s]`. The clamped value seeds the next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkCompatibleDelay {
    initial_delay: Duration,
    poll_interval: Duration,
    min_timeout: Duration,
    wait: Duration,
}

impl SdkCompatibleDelay {
    pub fn new(initial_delay: Duration, poll_interval: Duration, min_timeout: Duration) -> Self {
        Self {
            initial_delay,
            poll_interval,
            min_timeout,
            wait: INITIAL_WAIT,
        }
    }

    fn next_wait(&mut self) -> Duration {
        let mut wait = self.wait.saturating_mul(2);
        if !self.poll_interval.is_zero() && self.poll_interval < MAX_POLL_INTERVAL {
            wait = self.poll_interval;
        } else if wait < self.min_timeout {
            wait = self.min_timeout;
        } else if wait > MAX_WAIT {
            wait = MAX_WAIT;
        }
        self.wait = wait;
        wait
    }
}

impl Default for SdkCompatibleDelay {
    fn default() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, DEFAULT_MIN_TIMEOUT)
    }
}

impl Delay for SdkCompatibleDelay {
    fn delay(&mut self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }
        self.next_wait()
    }
}

/// SDK-compatible delay with a 500ms minimum and no poll-interval override
pub fn default_sdk_compatible_delay() -> SdkCompatibleDelay {
    SdkCompatibleDelay::default()
}
