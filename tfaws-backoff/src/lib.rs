//! tfaws Backoff
//!
//! Delay strategies and a deadline-bounded retry loop used by the provider's
//! waiters and retry helpers.
//!
//! # Overview
//!
//! - **Delay**: how long to wait before the Nth attempt ([`FixedDelay`],
//!   [`SdkCompatibleDelay`], or any `FnMut(u32) -> Duration`)
//! - **Loop**: sleeps between attempts and stops once `timeout + grace period`
//!   has passed
//! - **Context**: cooperative cancellation with an optional deadline
//! - **retry_when**: retries an operation while its error is retryable

pub mod context;
pub mod delay;
pub mod retry;
pub mod retry_loop;
pub mod timer;

pub use context::{Context, ContextError};
pub use delay::{
    Delay, FixedDelay, SdkCompatibleDelay, default_sdk_compatible_delay, fixed_delay,
};
pub use retry::{RetryError, retry_when, retry_when_with_config};
pub use retry_loop::{DEFAULT_GRACE_PERIOD, Loop, LoopConfig};
pub use timer::{Deadline, Timer, TokioTimer};
