// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::future::{Either, select};
use tick::Clock;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::{AcquireError, BulkheadBuilder, BulkheadPermit};
use crate::utils::TelemetryHelper;
use crate::{BulkheadFullError, BulkheadFullReason, CancelledError, GuardContext};

/// Bounds the number of concurrent calls to one dependency.
///
/// A bulkhead holds `capacity` permits. [`acquire`](Self::acquire) hands out a free permit
/// immediately. When none is free, the caller is rejected with
/// [`BulkheadFullReason::AtCapacity`] unless a wait queue is configured, in which case up to
/// `max_queue` callers wait in FIFO order for a released permit, each for at most `max_wait`.
///
/// Clones share the same permits.
///
/// # Examples
///
/// ```rust
/// use bulwark::GuardContext;
/// use bulwark::bulkhead::Bulkhead;
/// use bulwark::CancellationToken;
/// use tick::Clock;
///
/// # async fn example(clock: Clock) {
/// let context = GuardContext::new(&clock);
/// let bulkhead = Bulkhead::builder("search", &context).capacity(2).build();
///
/// let first = bulkhead.acquire(&CancellationToken::new()).await.unwrap();
/// let second = bulkhead.acquire(&CancellationToken::new()).await.unwrap();
/// assert!(bulkhead.acquire(&CancellationToken::new()).await.is_err());
///
/// first.release();
/// assert_eq!(bulkhead.available(), 1);
/// # drop(second);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Bulkhead {
    shared: Arc<BulkheadShared>,
}

#[derive(Debug)]
struct BulkheadShared {
    name: Cow<'static, str>,
    semaphore: Arc<Semaphore>,
    capacity: usize,
    max_queue: usize,
    max_wait: Option<Duration>,
    waiting: AtomicUsize,
    clock: Clock,
    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(dead_code, reason = "only read when logs or metrics are enabled")
    )]
    telemetry: TelemetryHelper,
}

impl Bulkhead {
    /// Starts building a bulkhead for the dependency called `name`.
    pub fn builder(name: impl Into<Cow<'static, str>>, context: &GuardContext) -> BulkheadBuilder {
        BulkheadBuilder::new(name.into(), context)
    }

    pub(super) fn new(
        name: Cow<'static, str>,
        capacity: usize,
        max_queue: usize,
        max_wait: Option<Duration>,
        clock: Clock,
        telemetry: TelemetryHelper,
    ) -> Self {
        Self {
            shared: Arc::new(BulkheadShared {
                name,
                semaphore: Arc::new(Semaphore::new(capacity)),
                capacity,
                max_queue,
                max_wait,
                waiting: AtomicUsize::new(0),
                clock,
                telemetry,
            }),
        }
    }

    /// The dependency name of this bulkhead.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Obtains a permit, waiting in the queue if one is configured.
    ///
    /// # Errors
    ///
    /// - [`AcquireError::Full`] when no permit is free and the caller cannot wait, the queue is
    ///   full, or the wait exceeded `max_wait`.
    /// - [`AcquireError::Cancelled`] when `cancellation` fires first.
    pub async fn acquire(&self, cancellation: &CancellationToken) -> Result<BulkheadPermit, AcquireError> {
        if cancellation.is_cancelled() {
            return Err(CancelledError::new(0).into());
        }

        if let Ok(permit) = Arc::clone(&self.shared.semaphore).try_acquire_owned() {
            return Ok(BulkheadPermit::new(permit));
        }

        if self.shared.max_queue == 0 {
            return Err(self.shared.reject(BulkheadFullReason::AtCapacity).into());
        }

        let Some(_slot) = QueueSlot::enter(&self.shared) else {
            return Err(self.shared.reject(BulkheadFullReason::QueueFull).into());
        };

        let acquire = pin!(Arc::clone(&self.shared.semaphore).acquire_owned());
        let cancelled = pin!(cancellation.cancelled());
        let timed_out = pin!(self.shared.wait_limit());

        match select(acquire, select(cancelled, timed_out)).await {
            Either::Left((Ok(permit), _)) => Ok(BulkheadPermit::new(permit)),
            // The semaphore is never closed.
            Either::Left((Err(_), _)) => Err(self.shared.reject(BulkheadFullReason::AtCapacity).into()),
            Either::Right((Either::Left(_), _)) => Err(CancelledError::new(0).into()),
            Either::Right((Either::Right(_), _)) => Err(self.shared.reject(BulkheadFullReason::WaitTimedOut).into()),
        }
    }

    /// Obtains a permit only if one is free right now.
    ///
    /// # Errors
    ///
    /// Returns [`BulkheadFullError`] with [`BulkheadFullReason::AtCapacity`] when all permits are in use.
    pub fn try_acquire(&self) -> Result<BulkheadPermit, BulkheadFullError> {
        match Arc::clone(&self.shared.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(BulkheadPermit::new(permit)),
            Err(_) => Err(self.shared.reject(BulkheadFullReason::AtCapacity)),
        }
    }

    /// The configured number of permits.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of permits currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.shared.semaphore.available_permits()
    }

    /// Number of permits currently held.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.shared.capacity.saturating_sub(self.available())
    }

    /// Number of callers waiting for a permit.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.shared.waiting.load(Ordering::Acquire)
    }
}

impl BulkheadShared {
    async fn wait_limit(&self) {
        match self.max_wait {
            Some(max_wait) => self.clock.delay(max_wait).await,
            None => std::future::pending().await,
        }
    }

    fn reject(&self, reason: BulkheadFullReason) -> BulkheadFullError {
        self.emit_rejected(reason);
        BulkheadFullError::new(self.name.clone(), self.capacity, reason)
    }

    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs nor metrics are used")
    )]
    fn emit_rejected(&self, reason: BulkheadFullReason) {
        #[cfg(any(feature = "metrics", test))]
        if self.telemetry.metrics_enabled() {
            use super::telemetry::{BULKHEAD_REASON, BULKHEAD_REJECTED_EVENT_NAME};

            self.telemetry
                .report_event(BULKHEAD_REJECTED_EVENT_NAME, &[opentelemetry::KeyValue::new(BULKHEAD_REASON, reason.as_str())]);
        }

        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "bulwark.bulkhead.rejected",
                tracing::Level::WARN,
                dependency.name = %self.name,
                strategy.name = self.telemetry.strategy_name,
                bulkhead.capacity = self.capacity,
                bulkhead.waiting = self.waiting.load(Ordering::Relaxed),
                bulkhead.reason = reason.as_str(),
            );
        }
    }
}

/// A reserved place in the wait queue, given back on drop.
struct QueueSlot<'a> {
    waiting: &'a AtomicUsize,
}

impl<'a> QueueSlot<'a> {
    fn enter(shared: &'a BulkheadShared) -> Option<Self> {
        shared
            .waiting
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |waiting| {
                (waiting < shared.max_queue).then_some(waiting.saturating_add(1))
            })
            .ok()
            .map(|_| Self { waiting: &shared.waiting })
    }
}

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.waiting.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use opentelemetry::KeyValue;
    use tick::ClockControl;

    use super::*;
    use crate::testing::{LogCapture, MetricTester};

    fn bulkhead(capacity: usize, max_queue: usize) -> Bulkhead {
        let context = GuardContext::new(tick::Clock::new_frozen());
        Bulkhead::builder("search", &context).capacity(capacity).max_queue(max_queue).build()
    }

    async fn wait_for_waiters(bulkhead: &Bulkhead, count: usize) {
        while bulkhead.waiting() < count {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn static_assertions() {
        static_assertions::assert_impl_all!(Bulkhead: Send, Sync, Clone, std::fmt::Debug);
        static_assertions::assert_impl_all!(BulkheadPermit: Send, Sync);
    }

    #[tokio::test]
    async fn rejects_when_at_capacity() {
        let bulkhead = bulkhead(2, 0);
        let token = CancellationToken::new();

        let _a = bulkhead.acquire(&token).await.unwrap();
        let _b = bulkhead.acquire(&token).await.unwrap();
        assert_eq!(bulkhead.in_use(), 2);
        assert_eq!(bulkhead.available(), 0);

        let AcquireError::Full(error) = bulkhead.acquire(&token).await.unwrap_err() else {
            panic!("expected full error");
        };
        assert_eq!(error.reason(), BulkheadFullReason::AtCapacity);
        assert_eq!(error.capacity(), 2);
        assert_eq!(error.name(), "search");
    }

    #[tokio::test]
    async fn released_permit_is_reusable() {
        let bulkhead = bulkhead(1, 0);
        let token = CancellationToken::new();

        let permit = bulkhead.acquire(&token).await.unwrap();
        bulkhead.try_acquire().unwrap_err();

        permit.release();
        assert_eq!(bulkhead.available(), 1);
        drop(bulkhead.try_acquire().unwrap());
    }

    #[tokio::test]
    async fn waiter_gets_permit_after_release() {
        let bulkhead = bulkhead(1, 1);
        let held = bulkhead.acquire(&CancellationToken::new()).await.unwrap();

        let waiter = tokio::spawn({
            let bulkhead = bulkhead.clone();
            async move { bulkhead.acquire(&CancellationToken::new()).await.map(drop) }
        });

        wait_for_waiters(&bulkhead, 1).await;
        drop(held);

        waiter.await.unwrap().unwrap();
        assert_eq!(bulkhead.waiting(), 0);
        assert_eq!(bulkhead.available(), 1);
    }

    #[tokio::test]
    async fn rejects_when_queue_is_full() {
        let bulkhead = bulkhead(1, 1);
        let held = bulkhead.acquire(&CancellationToken::new()).await.unwrap();

        let waiter = tokio::spawn({
            let bulkhead = bulkhead.clone();
            async move { bulkhead.acquire(&CancellationToken::new()).await.map(drop) }
        });
        wait_for_waiters(&bulkhead, 1).await;

        let AcquireError::Full(error) = bulkhead.acquire(&CancellationToken::new()).await.unwrap_err() else {
            panic!("expected full error");
        };
        assert_eq!(error.reason(), BulkheadFullReason::QueueFull);

        drop(held);
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn wait_times_out() {
        let clock = ClockControl::default().auto_advance_timers(true).to_clock();
        let context = GuardContext::new(&clock);
        let bulkhead = Bulkhead::builder("search", &context)
            .capacity(1)
            .max_queue(4)
            .max_wait(Duration::from_millis(250))
            .build();
        let _held = bulkhead.acquire(&CancellationToken::new()).await.unwrap();
        let stopwatch = clock.stopwatch();

        let AcquireError::Full(error) = bulkhead.acquire(&CancellationToken::new()).await.unwrap_err() else {
            panic!("expected full error");
        };

        assert_eq!(error.reason(), BulkheadFullReason::WaitTimedOut);
        assert!(stopwatch.elapsed() >= Duration::from_millis(250));
        assert_eq!(bulkhead.waiting(), 0);
    }

    #[tokio::test]
    async fn cancelled_while_waiting_leaves_queue() {
        let bulkhead = bulkhead(1, 1);
        let _held = bulkhead.acquire(&CancellationToken::new()).await.unwrap();
        let token = CancellationToken::new();

        let waiter = tokio::spawn({
            let bulkhead = bulkhead.clone();
            let token = token.clone();
            async move { bulkhead.acquire(&token).await.map(drop) }
        });
        wait_for_waiters(&bulkhead, 1).await;

        token.cancel();

        assert!(matches!(waiter.await.unwrap(), Err(AcquireError::Cancelled(e)) if e.attempts() == 0));
        assert_eq!(bulkhead.waiting(), 0);
    }

    #[tokio::test]
    async fn already_cancelled_token_is_rejected() {
        let bulkhead = bulkhead(1, 0);
        let token = CancellationToken::new();
        token.cancel();

        assert!(matches!(bulkhead.acquire(&token).await, Err(AcquireError::Cancelled(e)) if e.attempts() == 0));
        assert_eq!(bulkhead.available(), 1);
    }

    #[tokio::test]
    async fn rejection_telemetry() {
        let tester = MetricTester::new();
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        let context = GuardContext::new(tick::Clock::new_frozen())
            .enable_metrics(tester.meter_provider())
            .enable_logs();
        let bulkhead = Bulkhead::builder("search", &context).capacity(1).build();

        let _held = bulkhead.try_acquire().unwrap();
        let _ = bulkhead.try_acquire();

        tester.assert_attributes_contain(&[
            KeyValue::new("resilience.dependency.name", "search"),
            KeyValue::new("resilience.strategy.name", "bulkhead"),
            KeyValue::new("resilience.event.name", "bulkhead_rejected"),
            KeyValue::new("resilience.bulkhead.reason", "at_capacity"),
        ]);
        capture.assert_contains("at_capacity");
        capture.assert_contains("dependency.name=search");
    }
}
