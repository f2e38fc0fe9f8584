//! Loop - Deadline-bounded retry loop with pluggable delay
//!
//! ```ignore
//! let mut lp = Loop::new(Duration::from_secs(120));
//! while lp.proceed(&ctx).await {
//!     match try_something().await {
//!         Ok(v) => return Ok(v),
//!         Err(e) if is_retryable(&e) => continue,
//!         Err(e) => return Err(e),
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::context::Context;
use crate::delay::{Delay, default_sdk_compatible_delay};
use crate::timer::{Deadline, Timer, TokioTimer};

/// Default extra time granted past the nominal timeout
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Settings for a [`Loop`]
pub struct LoopConfig {
    delay: Box<dyn Delay>,
    grace_period: Duration,
    timer: Arc<dyn Timer>,
}

impl LoopConfig {
    /// Delay applied before each attempt
    pub fn with_delay(mut self, delay: impl Delay + 'static) -> Self {
        self.delay = Box::new(delay);
        self
    }

    /// Extra time added to the timeout when computing the deadline
    ///
    /// The deadline is only evaluated between sleeps, so the last attempt
    /// may overrun the nominal timeout; the grace period absorbs that.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Clock and sleep implementation
    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            delay: Box::new(default_sdk_compatible_delay()),
            grace_period: DEFAULT_GRACE_PERIOD,
            timer: Arc::new(TokioTimer),
        }
    }
}

impl fmt::Debug for LoopConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopConfig")
            .field("grace_period", &self.grace_period)
            .field("timer", &self.timer)
            .finish()
    }
}

/// A retry session bounded by `timeout + grace_period`
#[derive(Debug)]
pub struct Loop {
    attempt: u32,
    config: LoopConfig,
    deadline: Deadline,
    timed_out: bool,
}

impl Loop {
    /// Create a loop with the default configuration
    pub fn new(timeout: Duration) -> Self {
        Self::with_config(timeout, LoopConfig::default())
    }

    /// Create a loop; the deadline is fixed here and never moves
    pub fn with_config(timeout: Duration, config: LoopConfig) -> Self {
        let deadline = Deadline::new(
            config.timer.now(),
            timeout.saturating_add(config.grace_period),
        );
        Self {
            attempt: 0,
            config,
            deadline,
            timed_out: false,
        }
    }

    /// Wait for the next attempt and report whether it should run
    ///
    /// The first call (attempt 0) always proceeds. Later calls return false
    /// without sleeping once the deadline has passed. Otherwise the loop
    /// sleeps for the configured delay, returning early if the context is
    /// done, and proceeds only if the context is still live.
    pub async fn proceed(&mut self, ctx: &Context) -> bool {
        if self.attempt != 0 && self.deadline.remaining_at(self.config.timer.now()).is_zero() {
            log::debug!("retry loop deadline reached after {} attempts", self.attempt);
            self.timed_out = true;
            return false;
        }

        let delay = self.config.delay.delay(self.attempt);
        self.sleep(ctx, delay).await;
        self.attempt += 1;

        ctx.err().is_none()
    }

    /// Restart attempt numbering; the deadline is kept
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Whether the loop has ever stopped because of its deadline
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Number of attempts granted so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Absolute deadline, including the grace period
    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    async fn sleep(&self, ctx: &Context, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        log::trace!("retry loop sleeping {:?} before attempt {}", delay, self.attempt);
        tokio::select! {
            _ = self.config.timer.sleep(delay) => {}
            _ = ctx.done() => {}
        }
    }
}
