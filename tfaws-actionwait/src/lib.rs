//! tfaws Actionwait
//!
//! Generic status polling used by resource waiters to await eventual
//! consistency of long-running cloud operations.
//!
//! # Overview
//!
//! A waiter supplies a fetch operation (usually wrapping a describe call)
//! and an [`Options`] policy, then calls [`wait_for_status`]:
//!
//! ```ignore
//! use std::time::Duration;
//! use tfaws_actionwait::{Context, FetchResult, FixedInterval, Options, wait_for_status};
//!
//! let opts = Options::new(Duration::from_secs(20 * 60))
//!     .with_success_states(["CREATED"])
//!     .with_transitional_states(["CREATING"])
//!     .with_failure_states(["FAILED"])
//!     .with_interval(FixedInterval::new(Duration::from_secs(10)));
//!
//! let env = wait_for_status(&ctx, |_ctx| async {
//!     let out = client.get_environment().id(&id).send().await?;
//!     Ok::<_, aws_sdk_m2::Error>(FetchResult::new(out.status().as_str(), out))
//! }, opts)
//! .await?;
//! ```
//!
//! Failures carry a typed [`WaitError`]; [`is_timeout`],
//! [`is_failure_state`] and [`is_unexpected_state`] classify any error that
//! structurally wraps one.

pub mod config;
pub mod error;
pub mod interval;
pub mod options;
pub mod result;
pub mod status;
pub mod wait;

pub use config::{ResourceTimeouts, WaitConfig};
pub use error::{
    BoxError, FailureStateError, JoinedError, TimeoutError, UnexpectedStateError, WaitError,
    WaitFailure, is_failure_state, is_timeout, is_unexpected_state, join_errors,
};
pub use interval::{BackoffInterval, DEFAULT_INTERVAL, FixedInterval, IntervalStrategy};
pub use options::{ConfigError, Options, ProgressSink};
pub use result::{AnyFetchResult, FetchResult, ProgressMeta};
pub use status::Status;
pub use tfaws_backoff::{Context, ContextError};
pub use wait::wait_for_status;
