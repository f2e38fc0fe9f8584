//! Status polling loop
//!
//! [`wait_for_status`] repeatedly fetches a resource's status, classifies it
//! against the configured success/transitional/failure sets, and sleeps
//! between attempts until a terminal outcome, the timeout, or cancellation.

use std::future::Future;

use tfaws_backoff::{Context, Deadline};
use tokio::time::Instant;

use crate::error::{
    BoxError, FailureStateError, TimeoutError, UnexpectedStateError, WaitError, WaitFailure,
};
use crate::options::Options;
use crate::result::{FetchResult, ProgressMeta};
use crate::status::Status;

/// Decision for a single observed status
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Classification {
    /// Keep polling
    Continue,
    /// Enough consecutive success observations
    Success,
    /// Terminal failure or unexpected state
    Terminal(TerminalState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TerminalState {
    Failure(FailureStateError),
    Unexpected(UnexpectedStateError),
}

impl From<TerminalState> for WaitError {
    fn from(state: TerminalState) -> Self {
        match state {
            TerminalState::Failure(e) => WaitError::FailureState(e),
            TerminalState::Unexpected(e) => WaitError::UnexpectedState(e),
        }
    }
}

/// Classification state machine for one session
#[derive(Debug)]
pub(crate) struct StatusPolicy {
    success: Vec<Status>,
    transitional: Vec<Status>,
    failure: Vec<Status>,
    allowed: Vec<Status>,
    required: u32,
    streak: u32,
}

impl StatusPolicy {
    pub(crate) fn new(
        success: Vec<Status>,
        transitional: Vec<Status>,
        failure: Vec<Status>,
        consecutive_success: u32,
    ) -> Self {
        // failure states can never be allowed, even if also listed elsewhere
        let mut allowed: Vec<Status> = Vec::with_capacity(success.len() + transitional.len());
        for status in success.iter().chain(transitional.iter()) {
            if !failure.contains(status) && !allowed.contains(status) {
                allowed.push(status.clone());
            }
        }
        Self {
            success,
            transitional,
            failure,
            allowed,
            required: consecutive_success.max(1),
            streak: 0,
        }
    }

    pub(crate) fn classify(&mut self, status: &Status) -> Classification {
        if self.failure.contains(status) {
            return Classification::Terminal(TerminalState::Failure(FailureStateError {
                status: status.clone(),
            }));
        }

        if self.success.contains(status) {
            self.streak += 1;
            if self.streak >= self.required {
                return Classification::Success;
            }
            return Classification::Continue;
        }

        self.streak = 0;
        if !self.transitional.is_empty() && !self.transitional.contains(status) {
            return Classification::Terminal(TerminalState::Unexpected(UnexpectedStateError {
                status: status.clone(),
                allowed: self.allowed.clone(),
            }));
        }
        Classification::Continue
    }
}

/// Poll `fetch` until the reported status reaches a terminal outcome
///
/// Returns the successful result, or a [`WaitFailure`] carrying the error
/// and the last result observed. Fetch errors are passed through as
/// [`WaitError::Fetch`] without retrying; context cancellation is reported
/// as [`WaitError::Context`] and always wins over the session timeout.
pub async fn wait_for_status<T, F, Fut, E>(
    ctx: &Context,
    mut fetch: F,
    mut opts: Options,
) -> Result<FetchResult<T>, WaitFailure<T>>
where
    T: 'static,
    F: FnMut(Context) -> Fut,
    Fut: Future<Output = Result<FetchResult<T>, E>>,
    E: Into<BoxError>,
{
    if let Err(err) = opts.validate() {
        return Err(WaitFailure::new(err.into(), None));
    }
    let timeout = opts.timeout;
    let progress_interval = opts.progress_interval;
    let mut progress_sink = opts.progress_sink.take();
    let mut interval = opts.take_interval();
    let mut policy = StatusPolicy::new(
        opts.success_states,
        opts.transitional_states,
        opts.failure_states,
        opts.consecutive_success,
    );

    let start = Instant::now();
    let deadline = Deadline::new(start, timeout);
    let mut last: Option<FetchResult<T>> = None;
    let mut last_progress: Option<Instant> = None;
    let mut attempt: u32 = 0;

    loop {
        if let Some(err) = ctx.err() {
            return Err(WaitFailure::new(err.into(), last));
        }

        if Instant::now() > deadline.instant() {
            let last_status = last
                .as_ref()
                .map(|result| result.status.clone())
                .unwrap_or_default();
            let err = TimeoutError {
                last_status,
                timeout,
            };
            return Err(WaitFailure::new(err.into(), last));
        }

        let result = match fetch(ctx.clone()).await {
            Ok(result) => result,
            Err(err) => return Err(WaitFailure::new(WaitError::fetch(err), None)),
        };
        log::debug!("status wait attempt {}: {}", attempt, result.status);

        match policy.classify(&result.status) {
            Classification::Success => return Ok(result),
            Classification::Terminal(state) => {
                return Err(WaitFailure::new(state.into(), Some(result)));
            }
            Classification::Continue => {}
        }

        let next_poll = interval.next_poll(attempt);

        if let Some(sink) = progress_sink.as_mut()
            && !progress_interval.is_zero()
        {
            let now = Instant::now();
            let due = last_progress.is_none_or(|at| now.duration_since(at) >= progress_interval);
            if due {
                let meta = ProgressMeta {
                    attempt,
                    elapsed: now.duration_since(start),
                    remaining: deadline.remaining_at(now),
                    deadline: deadline.instant(),
                    next_poll,
                };
                sink(&result.erased(), &meta);
                last_progress = Some(now);
            }
        }

        last = Some(result);

        log::trace!("status wait sleeping {:?}", next_poll);
        if let Err(err) = ctx.sleep(next_poll).await {
            return Err(WaitFailure::new(err.into(), last));
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{is_failure_state, is_timeout, is_unexpected_state};
    use crate::interval::{BackoffInterval, FixedInterval};
    use crate::options::ConfigError;
    use std::convert::Infallible;
    use std::future::{Ready, ready};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tfaws_backoff::{ContextError, fixed_delay};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn statuses(list: &[&str]) -> Vec<Status> {
        list.iter().map(|s| Status::from(*s)).collect()
    }

    type Fetch = Box<dyn FnMut(Context) -> Ready<Result<FetchResult<usize>, Infallible>> + Send>;

    /// Fetch that replays `script` (repeating the last entry); the payload is
    /// the 1-based call number
    fn scripted(script: &[&str]) -> (Arc<AtomicUsize>, Fetch) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let script: Vec<String> = script.iter().map(|s| s.to_string()).collect();
        let fetch = move |_ctx: Context| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let status = script[n.min(script.len() - 1)].clone();
            ready(Ok(FetchResult::new(status, n + 1)))
        };
        (calls, Box::new(fetch))
    }

    fn policy(success: &[&str], transitional: &[&str], failure: &[&str], n: u32) -> StatusPolicy {
        StatusPolicy::new(
            statuses(success),
            statuses(transitional),
            statuses(failure),
            n,
        )
    }

    #[test]
    fn test_failure_wins_over_success() {
        let mut p = policy(&["DONE", "BROKEN"], &[], &["BROKEN"], 1);
        match p.classify(&Status::from("BROKEN")) {
            Classification::Terminal(TerminalState::Failure(e)) => assert_eq!(e.status, "BROKEN"),
            other => panic!("Expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_streak_resets_on_non_success() {
        let mut p = policy(&["READY"], &[], &[], 3);
        let ready = Status::from("READY");
        let building = Status::from("BUILDING");

        assert_eq!(p.classify(&ready), Classification::Continue);
        assert_eq!(p.classify(&ready), Classification::Continue);
        assert_eq!(p.classify(&building), Classification::Continue);
        // cumulative count is 3, but not consecutive
        assert_eq!(p.classify(&ready), Classification::Continue);
        assert_eq!(p.classify(&ready), Classification::Continue);
        assert_eq!(p.classify(&ready), Classification::Success);
    }

    #[test]
    fn test_empty_transitional_allows_anything() {
        let mut p = policy(&["OK"], &[], &["FAILED"], 1);
        for status in ["WHATEVER", "PENDING", "", "ok"] {
            assert_eq!(p.classify(&Status::from(status)), Classification::Continue);
        }
    }

    #[test]
    fn test_unexpected_state_reports_allowed() {
        let mut p = policy(&["OK"], &["PENDING"], &[], 1);
        match p.classify(&Status::from("UNKNOWN")) {
            Classification::Terminal(TerminalState::Unexpected(e)) => {
                assert_eq!(e.status, "UNKNOWN");
                assert_eq!(e.allowed, statuses(&["OK", "PENDING"]));
            }
            other => panic!("Expected unexpected state, got {:?}", other),
        }
    }

    #[test]
    fn test_allowed_excludes_failure_states() {
        let p = policy(&["OK"], &["PENDING", "ROLLBACK"], &["ROLLBACK"], 1);
        assert_eq!(p.allowed, statuses(&["OK", "PENDING"]));
    }

    #[test]
    fn test_zero_consecutive_success_means_one() {
        let mut p = policy(&["OK"], &[], &[], 0);
        assert_eq!(p.classify(&Status::from("OK")), Classification::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let opts = Options::new(ms(250)).with_success_states(["DONE"]);

        let result = wait_for_status(
            &Context::new(),
            move |_ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                ready(Ok::<_, Infallible>(FetchResult::new("DONE", 42)))
            },
            opts,
        )
        .await
        .unwrap();

        assert_eq!(result.status, "DONE");
        assert_eq!(result.value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transitional_states() {
        let (calls, fetch) = scripted(&["IN_PROGRESS", "IN_PROGRESS", "COMPLETE"]);
        let opts = Options::new(Duration::from_secs(1))
            .with_success_states(["COMPLETE"])
            .with_transitional_states(["IN_PROGRESS"])
            .with_interval(FixedInterval::new(ms(10)));

        let result = wait_for_status(&Context::new(), fetch, opts).await.unwrap();

        assert_eq!(result.status, "COMPLETE");
        assert_eq!(result.value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_state() {
        let (calls, fetch) = scripted(&["FAILED"]);
        let opts = Options::new(Duration::from_secs(1))
            .with_success_states(["DONE"])
            .with_failure_states(["FAILED"])
            .with_interval(FixedInterval::new(ms(10)));

        let failure = wait_for_status(&Context::new(), fetch, opts)
            .await
            .unwrap_err();

        match &failure.error {
            WaitError::FailureState(e) => assert_eq!(e.status, "FAILED"),
            other => panic!("Expected FailureState, got {:?}", other),
        }
        assert!(is_failure_state(&failure));
        assert!(!is_timeout(&failure));
        assert_eq!(failure.last.map(|r| r.status), Some(Status::from("FAILED")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_state() {
        let (_, fetch) = scripted(&["UNKNOWN"]);
        let opts = Options::new(Duration::from_secs(1))
            .with_success_states(["OK"])
            .with_transitional_states(["PENDING"])
            .with_interval(FixedInterval::new(ms(10)));

        let failure = wait_for_status(&Context::new(), fetch, opts)
            .await
            .unwrap_err();

        match &failure.error {
            WaitError::UnexpectedState(e) => {
                assert_eq!(e.status, "UNKNOWN");
                assert_eq!(e.allowed, statuses(&["OK", "PENDING"]));
            }
            other => panic!("Expected UnexpectedState, got {:?}", other),
        }
        assert!(is_unexpected_state(&failure));
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_success_required() {
        let (calls, fetch) = scripted(&["BUILDING", "READY", "BUILDING", "READY", "READY"]);
        let opts = Options::new(Duration::from_secs(1))
            .with_success_states(["READY"])
            .with_transitional_states(["BUILDING"])
            .with_consecutive_success(2)
            .with_interval(FixedInterval::new(ms(10)));

        let result = wait_for_status(&Context::new(), fetch, opts).await.unwrap();

        assert_eq!(result.status, "READY");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_is_not_a_timeout() {
        let (_, fetch) = scripted(&["PENDING"]);
        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ms(20)).await;
            canceller.cancel();
        });
        let opts = Options::new(ms(500))
            .with_success_states(["DONE"])
            .with_interval(FixedInterval::new(ms(5)));

        let started = Instant::now();
        let failure = wait_for_status(&ctx, fetch, opts).await.unwrap_err();

        match failure.error {
            WaitError::Context(ContextError::Canceled) => {}
            ref other => panic!("Expected cancellation, got {:?}", other),
        }
        assert!(!is_timeout(&failure));
        assert!(failure.last.is_some());
        assert!(started.elapsed() < ms(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_budget() {
        let (calls, fetch) = scripted(&["PENDING"]);
        let opts = Options::new(ms(100))
            .with_success_states(["DONE"])
            .with_interval(FixedInterval::new(ms(10)));

        let started = Instant::now();
        let failure = wait_for_status(&Context::new(), fetch, opts)
            .await
            .unwrap_err();

        assert!(started.elapsed() >= ms(100));
        match &failure.error {
            WaitError::Timeout(e) => {
                assert_eq!(e.last_status, "PENDING");
                assert_eq!(e.timeout, ms(100));
            }
            other => panic!("Expected Timeout, got {:?}", other),
        }
        assert!(is_timeout(&failure));
        assert!(calls.load(Ordering::SeqCst) >= 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_timeout_polls_normally() {
        let (calls, fetch) = scripted(&["PENDING", "DONE"]);
        let opts = Options::new(Duration::MAX)
            .with_success_states(["DONE"])
            .with_interval(FixedInterval::new(ms(10)));

        let result = wait_for_status(&Context::new(), fetch, opts).await.unwrap();

        assert_eq!(result.status, "DONE");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_deadline_wins_over_timeout() {
        let (_, fetch) = scripted(&["PENDING"]);
        let ctx = Context::new().with_timeout(ms(50));
        let opts = Options::new(Duration::from_secs(1))
            .with_success_states(["DONE"])
            .with_interval(FixedInterval::new(ms(20)));

        let failure = wait_for_status(&ctx, fetch, opts).await.unwrap_err();

        assert!(matches!(
            failure.error,
            WaitError::Context(ContextError::DeadlineExceeded)
        ));
        assert!(!is_timeout(&failure));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_fetch_after_cancellation() {
        let (calls, fetch) = scripted(&["DONE"]);
        let ctx = Context::new();
        ctx.cancel();
        let opts = Options::new(Duration::from_secs(1)).with_success_states(["DONE"]);

        let failure = wait_for_status(&ctx, fetch, opts).await.unwrap_err();

        assert!(failure.error.is_context());
        assert!(failure.last.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validation_happens_before_fetch() {
        let (calls, fetch) = scripted(&["DONE"]);
        let opts = Options::new(Duration::from_secs(1));

        let failure = wait_for_status(&Context::new(), fetch, opts)
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            WaitError::Config(ConfigError::NoSuccessStates)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let (calls, fetch) = scripted(&["DONE"]);
        let opts = Options::new(Duration::ZERO).with_success_states(["DONE"]);
        let failure = wait_for_status(&Context::new(), fetch, opts)
            .await
            .unwrap_err();
        assert!(matches!(
            failure.error,
            WaitError::Config(ConfigError::MissingTimeout)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("describe call failed: {0}")]
    struct DescribeError(&'static str);

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_passed_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let opts = Options::new(Duration::from_secs(1))
            .with_success_states(["DONE"])
            .with_interval(FixedInterval::new(ms(10)));

        let failure = wait_for_status(
            &Context::new(),
            move |_ctx| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                ready(if n == 0 {
                    Ok(FetchResult::new("PENDING", ()))
                } else {
                    Err(DescribeError("throttled"))
                })
            },
            opts,
        )
        .await
        .unwrap_err();

        assert_eq!(failure.to_string(), "describe call failed: throttled");
        match &failure.error {
            WaitError::Fetch(inner) => assert!(inner.downcast_ref::<DescribeError>().is_some()),
            other => panic!("Expected Fetch, got {:?}", other),
        }
        assert!(failure.last.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_interval_is_thirty_seconds() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();
        let opts = Options::new(Duration::from_secs(120)).with_success_states(["DONE"]);

        wait_for_status(
            &Context::new(),
            move |_ctx| {
                let mut seen = record.lock().unwrap();
                seen.push(Instant::now());
                let status = if seen.len() < 2 { "PENDING" } else { "DONE" };
                ready(Ok::<_, Infallible>(FetchResult::new(status, ())))
            },
            opts,
        )
        .await
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1] - seen[0] >= Duration::from_secs(30));
        assert!(seen[1] - seen[0] < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_interval_first_poll_is_immediate() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();
        let opts = Options::new(Duration::from_secs(10))
            .with_success_states(["DONE"])
            .with_interval(BackoffInterval::new(fixed_delay(ms(200))));

        wait_for_status(
            &Context::new(),
            move |_ctx| {
                let mut seen = record.lock().unwrap();
                seen.push(Instant::now());
                let status = if seen.len() < 3 { "PENDING" } else { "DONE" };
                ready(Ok::<_, Infallible>(FetchResult::new(status, ())))
            },
            opts,
        )
        .await
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[1] - seen[0], Duration::ZERO);
        assert!(seen[2] - seen[1] >= ms(200));
        assert!(seen[2] - seen[1] < ms(205));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_throttled() {
        let (calls, fetch) = scripted(&["PENDING"]);
        let reports: Arc<Mutex<Vec<(ProgressMeta, Status, usize)>>> =
            Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let opts = Options::new(ms(200))
            .with_success_states(["DONE"])
            .with_interval(FixedInterval::new(ms(10)))
            .with_progress(ms(35), move |result, meta| {
                let value = result.downcast_ref::<usize>().copied().unwrap_or_default();
                sink.lock()
                    .unwrap()
                    .push((*meta, result.status().clone(), value));
            });

        let failure = wait_for_status(&Context::new(), fetch, opts)
            .await
            .unwrap_err();
        assert!(failure.error.is_timeout());

        let fetches = calls.load(Ordering::SeqCst);
        let reports = reports.lock().unwrap();
        assert!(reports.len() > 1);
        assert!(reports.len() < fetches);

        assert_eq!(reports[0].0.attempt, 0);
        assert_eq!(reports[0].2, 1);
        for pair in reports.windows(2) {
            assert!(pair[1].0.attempt > pair[0].0.attempt);
            assert!(pair[1].0.elapsed - pair[0].0.elapsed >= ms(35));
        }
        for (meta, status, _) in reports.iter() {
            assert_eq!(status, &Status::from("PENDING"));
            assert_eq!(meta.next_poll, ms(10));
            assert_eq!(meta.elapsed + meta.remaining, ms(200));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_progress_interval_disables_progress() {
        let (_, fetch) = scripted(&["PENDING", "PENDING", "DONE"]);
        let reports = Arc::new(AtomicUsize::new(0));
        let sink = reports.clone();
        let opts = Options::new(Duration::from_secs(1))
            .with_success_states(["DONE"])
            .with_interval(FixedInterval::new(ms(10)))
            .with_progress(Duration::ZERO, move |_, _| {
                sink.fetch_add(1, Ordering::SeqCst);
            });

        wait_for_status(&Context::new(), fetch, opts).await.unwrap();
        assert_eq!(reports.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_run_concurrently() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut handles = Vec::new();
        for i in 0..4_usize {
            handles.push(tokio::spawn(async move {
                let mut script = vec!["CREATING"; i];
                script.push("AVAILABLE");
                let (calls, fetch) = scripted(&script);
                let opts = Options::new(Duration::from_secs(5))
                    .with_success_states(["AVAILABLE"])
                    .with_transitional_states(["CREATING"])
                    .with_interval(FixedInterval::new(ms(10)));
                let result = wait_for_status(&Context::new(), fetch, opts).await;
                (result.map(|r| r.value).ok(), calls.load(Ordering::SeqCst))
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            let (value, calls) = handle.await.unwrap();
            assert_eq!(value, Some(i + 1));
            assert_eq!(calls, i + 1);
        }
    }
}
