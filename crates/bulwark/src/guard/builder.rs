// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

use super::Guard;
use crate::GuardContext;
use crate::breaker::{CircuitBreaker, CircuitBreakerBuilder};
use crate::bulkhead::{Bulkhead, BulkheadBuilder};
use crate::config::GuardConfig;
use crate::retry::{RetryExecutor, RetryExecutorBuilder};

/// Builder for [`Guard`], created by [`Guard::builder`].
///
/// Each strategy starts from its own defaults and is customized through a closure that receives
/// the strategy's builder:
///
/// ```rust
/// use std::time::Duration;
///
/// use bulwark::retry::RetryPolicy;
/// use bulwark::{Guard, GuardContext};
/// use tick::Clock;
///
/// # fn example(clock: Clock) {
/// let guard = Guard::builder("ledger", &GuardContext::new(&clock))
///     .breaker(|b| b.failure_threshold(10))
///     .retry(|r| r.policy(RetryPolicy::new().max_attempts(5)).handle_unavailable(true))
///     .bulkhead(|b| b.capacity(32).max_queue(8).max_wait(Duration::from_millis(200)))
///     .build();
/// # }
/// ```
#[derive(Debug)]
pub struct GuardBuilder {
    name: Cow<'static, str>,
    breaker: CircuitBreakerBuilder,
    retry: RetryExecutorBuilder,
    bulkhead: BulkheadBuilder,
}

impl GuardBuilder {
    pub(super) fn new(name: Cow<'static, str>, context: &GuardContext) -> Self {
        Self {
            breaker: CircuitBreaker::builder(name.clone(), context),
            retry: RetryExecutor::builder(name.clone(), context),
            bulkhead: Bulkhead::builder(name.clone(), context),
            name,
        }
    }

    /// Customizes the circuit breaker.
    #[must_use]
    pub fn breaker(mut self, configure: impl FnOnce(CircuitBreakerBuilder) -> CircuitBreakerBuilder) -> Self {
        self.breaker = configure(self.breaker);
        self
    }

    /// Customizes the retry executor.
    #[must_use]
    pub fn retry(mut self, configure: impl FnOnce(RetryExecutorBuilder) -> RetryExecutorBuilder) -> Self {
        self.retry = configure(self.retry);
        self
    }

    /// Customizes the bulkhead.
    #[must_use]
    pub fn bulkhead(mut self, configure: impl FnOnce(BulkheadBuilder) -> BulkheadBuilder) -> Self {
        self.bulkhead = configure(self.bulkhead);
        self
    }

    /// Applies every section of a [`GuardConfig`].
    #[must_use]
    pub fn config(self, config: &GuardConfig) -> Self {
        self.breaker(|b| b.config(&config.breaker))
            .retry(|r| r.config(&config.retry))
            .bulkhead(|b| b.config(&config.bulkhead))
    }

    /// Builds the guard.
    #[must_use]
    pub fn build(self) -> Guard {
        Guard::new(self.name, self.bulkhead.build(), self.breaker.build(), self.retry.build())
    }
}
