// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::Duration;

use tokio::sync::Semaphore;

use super::Bulkhead;
use super::constants::{DEFAULT_CAPACITY, DEFAULT_MAX_QUEUE};
use super::telemetry::STRATEGY_NAME;
use crate::GuardContext;
use crate::config::BulkheadConfig;

/// Builder for [`Bulkhead`], created by [`Bulkhead::builder`].
///
/// Defaults:
///
/// | Option | Default |
/// |--------|---------|
/// | [`capacity`](Self::capacity) | 64 |
/// | [`max_queue`](Self::max_queue) | 0 (reject immediately when full) |
/// | [`max_wait`](Self::max_wait) | unbounded |
#[derive(Debug)]
pub struct BulkheadBuilder {
    name: Cow<'static, str>,
    context: GuardContext,
    capacity: usize,
    max_queue: usize,
    max_wait: Option<Duration>,
}

impl BulkheadBuilder {
    pub(super) fn new(name: Cow<'static, str>, context: &GuardContext) -> Self {
        Self {
            name,
            context: context.clone(),
            capacity: DEFAULT_CAPACITY,
            max_queue: DEFAULT_MAX_QUEUE,
            max_wait: None,
        }
    }

    /// Sets the number of concurrent permits.
    ///
    /// Zero is treated as one. Values above [`Semaphore::MAX_PERMITS`] (`usize::MAX >> 3`) are
    /// clamped to it, so `usize::MAX` reads as "effectively unbounded".
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    /// Sets how many callers may wait for a permit when all are in use.
    #[must_use]
    pub fn max_queue(mut self, max_queue: usize) -> Self {
        self.max_queue = max_queue;
        self
    }

    /// Sets the longest time a queued caller waits for a permit. `None` waits until a permit is
    /// released or the caller's token is cancelled.
    #[must_use]
    pub fn max_wait(mut self, max_wait: impl Into<Option<Duration>>) -> Self {
        self.max_wait = max_wait.into();
        self
    }

    /// Applies the values of a [`BulkheadConfig`].
    #[must_use]
    pub fn config(self, config: &BulkheadConfig) -> Self {
        self.capacity(config.capacity).max_queue(config.max_queue).max_wait(config.max_wait)
    }

    /// Builds the bulkhead.
    #[must_use]
    pub fn build(self) -> Bulkhead {
        let telemetry = self.context.create_telemetry(self.name.clone(), STRATEGY_NAME);

        Bulkhead::new(
            self.name,
            self.capacity,
            self.max_queue,
            self.max_wait,
            self.context.clock().clone(),
            telemetry,
        )
    }
}
