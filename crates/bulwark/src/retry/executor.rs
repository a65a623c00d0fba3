// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::pin::pin;
use std::time::Duration;

use futures_util::future::{Either, select};
use tick::Clock;
use tokio_util::sync::CancellationToken;

use super::callbacks::OnRetry;
use super::{OnRetryArgs, RetryError, RetryExecutorBuilder, RetryPolicy};
use crate::rnd::Rnd;
use crate::utils::TelemetryHelper;
use crate::{Attempt, CancelledError, GuardContext, OperationError, RecoveryInfo, RecoveryKind};

/// Runs an operation with bounded retries and exponential backoff.
///
/// An attempt that fails with an error classified as [`RecoveryKind::Retry`] is retried after the
/// next backoff delay until [`RetryPolicy::get_max_attempts`] attempts have been made. Errors
/// classified as [`RecoveryKind::Unavailable`] are retried only when
/// [`handle_unavailable`](RetryExecutorBuilder::handle_unavailable) is enabled. Any other error
/// is returned immediately.
///
/// A delay suggested by the error ([`RecoveryInfo::get_delay`]) takes precedence over the computed
/// backoff and is capped at [`RetryPolicy::get_max_backoff`].
///
/// Both the operation and the backoff wait are raced against the cancellation token; a fired
/// token drops the in-flight operation and returns [`RetryError::Cancelled`].
///
/// # Examples
///
/// ```rust
/// use bulwark::retry::{RetryExecutor, RetryPolicy};
/// use bulwark::{CancellationToken, GuardContext, RecoveryInfo};
/// use tick::Clock;
///
/// # async fn example(clock: Clock) {
/// let context = GuardContext::new(&clock);
/// let executor = RetryExecutor::builder("inventory", &context)
///     .policy(RetryPolicy::new().max_attempts(5))
///     .build();
///
/// let result = executor
///     .execute(
///         || async { Err::<u32, _>("connection reset") },
///         |_| RecoveryInfo::retry(),
///         &CancellationToken::new(),
///     )
///     .await;
///
/// assert_eq!(result.unwrap_err().attempts(), 5);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    pub(super) name: Cow<'static, str>,
    pub(super) policy: RetryPolicy,
    pub(super) clock: Clock,
    pub(super) rnd: Rnd,
    pub(super) handle_unavailable: bool,
    pub(super) on_retry: Option<OnRetry>,
    pub(super) telemetry: TelemetryHelper,
}

impl RetryExecutor {
    /// Starts building an executor for the dependency called `name`.
    pub fn builder(name: impl Into<Cow<'static, str>>, context: &GuardContext) -> RetryExecutorBuilder {
        RetryExecutorBuilder::new(name.into(), context)
    }

    /// The dependency name of this executor.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The retry policy in use.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invokes `operation` until it succeeds, fails permanently, runs out of attempts, or
    /// `cancellation` fires.
    ///
    /// `classify` maps each error to a [`RecoveryInfo`] that decides whether to retry.
    ///
    /// # Errors
    ///
    /// - [`RetryError::Operation`] with the last error and the number of attempts made.
    /// - [`RetryError::Cancelled`] when the token fired first.
    pub async fn execute<T, E, Op, Fut, C>(&self, mut operation: Op, classify: C, cancellation: &CancellationToken) -> Result<T, RetryError<E>>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RecoveryInfo,
    {
        let max_attempts = self.policy.get_max_attempts();
        let mut delays = self.policy.delays(self.rnd.clone());
        let mut attempt = Attempt::first(max_attempts);

        loop {
            if cancellation.is_cancelled() {
                return Err(CancelledError::new(attempt.index()).into());
            }

            let error = match run_attempt(operation(), cancellation).await {
                Some(Ok(value)) => return Ok(value),
                Some(Err(error)) => error,
                None => return Err(CancelledError::new(attempt.number()).into()),
            };

            let recovery = classify(&error);
            let next = if self.is_recoverable(&recovery) {
                attempt.increment(max_attempts)
            } else {
                None
            };

            let Some(next) = next else {
                return Err(OperationError::new(error, attempt.number(), recovery).into());
            };

            let delay = self.compute_retry_delay(&recovery, &mut delays);
            self.invoke_on_retry(attempt, delay, &recovery);
            self.emit_telemetry(attempt, delay, &recovery);

            if !self.wait(delay, cancellation).await {
                return Err(CancelledError::new(attempt.number()).into());
            }

            attempt = next;
        }
    }

    fn is_recoverable(&self, recovery: &RecoveryInfo) -> bool {
        match recovery.kind() {
            RecoveryKind::Retry => true,
            RecoveryKind::Unavailable => self.handle_unavailable,
            RecoveryKind::Never | RecoveryKind::Unknown | _ => false,
        }
    }

    fn compute_retry_delay(&self, recovery: &RecoveryInfo, delays: &mut impl Iterator<Item = Duration>) -> Duration {
        let backoff_delay = delays.next().unwrap_or(Duration::ZERO);

        recovery
            .get_delay()
            .map_or(backoff_delay, |hint| hint.min(self.policy.get_max_backoff()))
    }

    /// Returns `false` when cancelled before the delay elapsed.
    async fn wait(&self, delay: Duration, cancellation: &CancellationToken) -> bool {
        let delay = pin!(self.clock.delay(delay));
        let cancelled = pin!(cancellation.cancelled());

        matches!(select(delay, cancelled).await, Either::Left(_))
    }

    fn invoke_on_retry(&self, attempt: Attempt, retry_delay: Duration, recovery: &RecoveryInfo) {
        if let Some(on_retry) = &self.on_retry {
            on_retry.call(OnRetryArgs {
                attempt,
                retry_delay,
                recovery: recovery.clone(),
            });
        }
    }

    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs nor metrics are used")
    )]
    fn emit_telemetry(&self, attempt: Attempt, retry_delay: Duration, recovery: &RecoveryInfo) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "bulwark.retry",
                tracing::Level::WARN,
                dependency.name = %self.name,
                strategy.name = self.telemetry.strategy_name,
                resilience.attempt.index = attempt.index(),
                resilience.attempt.is_last = attempt.is_last(),
                resilience.retry.delay = retry_delay.as_secs_f32(),
                resilience.recovery.kind = %recovery.kind(),
            );
        }

        #[cfg(any(feature = "metrics", test))]
        if self.telemetry.metrics_enabled() {
            use super::telemetry::{ATTEMPT_INDEX, RECOVERY_KIND, RETRY_EVENT};

            self.telemetry.report_event(
                RETRY_EVENT,
                &[
                    opentelemetry::KeyValue::new(ATTEMPT_INDEX, i64::from(attempt.index())),
                    opentelemetry::KeyValue::new(RECOVERY_KIND, recovery.kind().to_string()),
                ],
            );
        }
    }
}

/// Runs one attempt; `None` means the token fired first and the attempt was dropped.
async fn run_attempt<F: Future>(attempt: F, cancellation: &CancellationToken) -> Option<F::Output> {
    let attempt = pin!(attempt);
    let cancelled = pin!(cancellation.cancelled());

    match select(attempt, cancelled).await {
        Either::Left((output, _)) => Some(output),
        Either::Right(_) => None,
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use opentelemetry::KeyValue;
    use tick::ClockControl;

    use super::*;
    use crate::testing::{LogCapture, MetricTester};

    fn executor(context: &GuardContext, max_attempts: u32) -> RetryExecutor {
        RetryExecutor::builder("orders", context)
            .policy(
                RetryPolicy::new()
                    .max_attempts(max_attempts)
                    .initial_backoff(Duration::from_millis(100))
                    .max_backoff(Duration::from_secs(1))
                    .jitter_fraction(0.0),
            )
            .build()
    }

    fn auto_context() -> GuardContext {
        GuardContext::new(ClockControl::default().auto_advance_timers(true).to_clock())
    }

    #[test]
    fn static_assertions() {
        static_assertions::assert_impl_all!(RetryExecutor: Send, Sync, Clone, std::fmt::Debug);
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let executor = executor(&auto_context(), 3);
        let calls = AtomicU32::new(0);

        let result = executor
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, String>("ok") }
                },
                |_| RecoveryInfo::retry(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let executor = executor(&auto_context(), 5);
        let calls = AtomicU32::new(0);

        let result = executor
            .execute(
                || {
                    let call = calls.fetch_add(1, Ordering::SeqCst);
                    async move { if call < 2 { Err("transient") } else { Ok(call) } }
                },
                |_| RecoveryInfo::retry(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_returns_last_error() {
        let executor = executor(&auto_context(), 3);
        let calls = AtomicU32::new(0);

        let error = executor
            .execute(
                || {
                    let call = calls.fetch_add(1, Ordering::SeqCst);
                    async move { Err::<(), _>(format!("failure {call}")) }
                },
                |_| RecoveryInfo::retry(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        let RetryError::Operation(error) = error else {
            panic!("expected operation error");
        };
        assert_eq!(error.attempts(), 3);
        assert_eq!(error.error(), "failure 2");
        assert_eq!(error.recovery(), &RecoveryInfo::retry());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_is_returned_immediately() {
        let executor = executor(&auto_context(), 3);
        let calls = AtomicU32::new(0);

        let error = executor
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>("invalid input") }
                },
                |_| RecoveryInfo::never(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(error.attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_is_retried_only_when_enabled() {
        let context = auto_context();
        let calls = AtomicU32::new(0);
        let operation = || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("down") }
        };

        let error = executor(&context, 3)
            .execute(operation, |_| RecoveryInfo::unavailable(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(error.attempts(), 1);

        let executor = RetryExecutor::builder("orders", &context)
            .policy(RetryPolicy::new().max_attempts(3).jitter_fraction(0.0))
            .handle_unavailable(true)
            .build();
        let error = executor
            .execute(operation, |_| RecoveryInfo::unavailable(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(error.attempts(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn waits_for_backoff_between_attempts() {
        let clock = ClockControl::default().auto_advance_timers(true).to_clock();
        let executor = executor(&GuardContext::new(&clock), 3);
        let stopwatch = clock.stopwatch();

        let _ = executor
            .execute(|| async { Err::<(), _>("boom") }, |_| RecoveryInfo::retry(), &CancellationToken::new())
            .await;

        let elapsed = stopwatch.elapsed();
        assert!(elapsed >= Duration::from_millis(299), "elapsed {elapsed:?}");
        assert!(elapsed <= Duration::from_millis(301), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn delay_hint_overrides_backoff_and_is_capped() {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let delays_clone = Arc::clone(&delays);
        let executor = RetryExecutor::builder("orders", &auto_context())
            .policy(
                RetryPolicy::new()
                    .max_attempts(3)
                    .max_backoff(Duration::from_secs(2))
                    .jitter_fraction(0.0),
            )
            .on_retry(move |args| delays_clone.lock().unwrap().push(args.retry_delay()))
            .build();
        let calls = AtomicU32::new(0);

        let _ = executor
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>("throttled") }
                },
                |_| {
                    if calls.load(Ordering::SeqCst) == 1 {
                        RecoveryInfo::retry().delay(Duration::from_millis(700))
                    } else {
                        RecoveryInfo::retry().delay(Duration::from_secs(30))
                    }
                },
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(*delays.lock().unwrap(), vec![Duration::from_millis(700), Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn on_retry_receives_failed_attempt() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let attempts_clone = Arc::clone(&attempts);
        let executor = RetryExecutor::builder("orders", &auto_context())
            .policy(RetryPolicy::new().max_attempts(3).jitter_fraction(0.0))
            .on_retry(move |args| {
                assert_eq!(args.recovery().kind(), RecoveryKind::Retry);
                attempts_clone.lock().unwrap().push(args.attempt().index());
            })
            .build();

        let _ = executor
            .execute(|| async { Err::<(), _>("boom") }, |_| RecoveryInfo::retry(), &CancellationToken::new())
            .await;

        assert_eq!(*attempts.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn already_cancelled_token_skips_operation() {
        let executor = executor(&auto_context(), 3);
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);

        let error = executor
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, String>(()) }
                },
                |_| RecoveryInfo::retry(),
                &token,
            )
            .await
            .unwrap_err();

        assert!(matches!(error, RetryError::Cancelled(ref e) if e.attempts() == 0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_during_backoff_stops_retrying() {
        let control = ClockControl::new();
        let executor = executor(&GuardContext::new(control.to_clock()), 5);
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let cancel = token.clone();
        let error = executor
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    cancel.cancel();
                    async { Err::<(), _>("boom") }
                },
                |_| RecoveryInfo::retry(),
                &token,
            )
            .await
            .unwrap_err();

        assert!(matches!(error, RetryError::Cancelled(ref e) if e.attempts() == 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_drops_in_flight_attempt() {
        let executor = executor(&auto_context(), 3);
        let token = CancellationToken::new();
        let cancel = token.clone();

        let error = executor
            .execute(
                || {
                    let cancel = cancel.clone();
                    async move {
                        cancel.cancel();
                        std::future::pending::<Result<(), String>>().await
                    }
                },
                |_| RecoveryInfo::retry(),
                &token,
            )
            .await
            .unwrap_err();

        assert_eq!(error.attempts(), 1);
        assert!(matches!(error, RetryError::Cancelled(_)));
    }

    #[tokio::test]
    async fn single_attempt_policy_never_retries() {
        let executor = executor(&auto_context(), 0);
        let calls = AtomicU32::new(0);

        let error = executor
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>("boom") }
                },
                |_| RecoveryInfo::retry(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(error.attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn telemetry_is_emitted() {
        let tester = MetricTester::new();
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        let context = auto_context().enable_metrics(tester.meter_provider()).enable_logs();

        let _ = executor(&context, 2)
            .execute(|| async { Err::<(), _>("boom") }, |_| RecoveryInfo::retry(), &CancellationToken::new())
            .await;

        tester.assert_attributes_contain(&[
            KeyValue::new("resilience.dependency.name", "orders"),
            KeyValue::new("resilience.strategy.name", "retry"),
            KeyValue::new("resilience.event.name", "retry"),
            KeyValue::new("resilience.attempt.index", 0_i64),
            KeyValue::new("resilience.recovery.kind", "retry"),
        ]);
        capture.assert_contains("resilience.attempt.index=0");
        capture.assert_contains("dependency.name=orders");
    }
}
