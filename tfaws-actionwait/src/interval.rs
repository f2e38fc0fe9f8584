//! Interval strategies: delay between two polls

use std::fmt;
use std::time::Duration;

use tfaws_backoff::Delay;

/// Polling interval used when none is configured
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Computes how long to wait after the given attempt before polling again
pub trait IntervalStrategy: Send {
    fn next_poll(&mut self, attempt: u32) -> Duration;
}

/// The same interval after every attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedInterval(pub Duration);

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self(interval)
    }
}

impl Default for FixedInterval {
    fn default() -> Self {
        Self(DEFAULT_INTERVAL)
    }
}

impl IntervalStrategy for FixedInterval {
    fn next_poll(&mut self, _attempt: u32) -> Duration {
        self.0
    }
}

/// Interval driven by a backoff [`Delay`]
pub struct BackoffInterval {
    delay: Box<dyn Delay>,
}

impl BackoffInterval {
    pub fn new(delay: impl Delay + 'static) -> Self {
        Self {
            delay: Box::new(delay),
        }
    }
}

impl fmt::Debug for BackoffInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackoffInterval").finish_non_exhaustive()
    }
}

impl IntervalStrategy for BackoffInterval {
    fn next_poll(&mut self, attempt: u32) -> Duration {
        self.delay.delay(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfaws_backoff::{default_sdk_compatible_delay, fixed_delay};

    #[test]
    fn test_fixed_interval_ignores_attempt() {
        let mut interval = FixedInterval::new(Duration::from_millis(10));
        assert_eq!(interval.next_poll(0), Duration::from_millis(10));
        assert_eq!(interval.next_poll(99), Duration::from_millis(10));
        assert_eq!(FixedInterval::default().next_poll(0), DEFAULT_INTERVAL);
    }

    #[test]
    fn test_backoff_interval_delegates_to_delay() {
        let mut interval = BackoffInterval::new(fixed_delay(Duration::from_secs(2)));
        assert_eq!(interval.next_poll(0), Duration::ZERO);
        assert_eq!(interval.next_poll(1), Duration::from_secs(2));

        let mut interval = BackoffInterval::new(default_sdk_compatible_delay());
        let polls: Vec<u64> = (0..4)
            .map(|n| interval.next_poll(n).as_millis() as u64)
            .collect();
        assert_eq!(polls, vec![0, 500, 1_000, 2_000]);
    }
}
