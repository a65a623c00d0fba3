// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

use super::callbacks::OnRetry;
use super::telemetry::STRATEGY_NAME;
use super::{OnRetryArgs, RetryExecutor, RetryPolicy};
use crate::GuardContext;
use crate::config::RetryConfig;
use crate::rnd::Rnd;

/// Builder for [`RetryExecutor`], created by [`RetryExecutor::builder`].
#[derive(Debug)]
pub struct RetryExecutorBuilder {
    name: Cow<'static, str>,
    context: GuardContext,
    policy: RetryPolicy,
    handle_unavailable: bool,
    on_retry: Option<OnRetry>,
    rnd: Rnd,
}

impl RetryExecutorBuilder {
    pub(super) fn new(name: Cow<'static, str>, context: &GuardContext) -> Self {
        Self {
            name,
            context: context.clone(),
            policy: RetryPolicy::default(),
            handle_unavailable: false,
            on_retry: None,
            rnd: Rnd::default(),
        }
    }

    /// Sets the retry policy.
    ///
    /// **Default**: [`RetryPolicy::default`]
    #[must_use]
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Retries errors classified as [`RecoveryKind::Unavailable`][crate::RecoveryKind::Unavailable].
    ///
    /// An unavailable dependency is usually better left to the circuit breaker, so these errors
    /// are returned without retrying unless this is enabled.
    ///
    /// **Default**: `false`
    #[must_use]
    pub fn handle_unavailable(mut self, enable: bool) -> Self {
        self.handle_unavailable = enable;
        self
    }

    /// Registers a callback invoked after a failed attempt, before waiting for the retry delay.
    #[must_use]
    pub fn on_retry(mut self, callback: impl Fn(OnRetryArgs) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(OnRetry::new(callback));
        self
    }

    /// Applies the values of a [`RetryConfig`].
    #[must_use]
    pub fn config(self, config: &RetryConfig) -> Self {
        self.policy(config.to_policy()).handle_unavailable(config.handle_unavailable)
    }

    #[cfg(test)]
    pub(crate) fn rnd(mut self, rnd: Rnd) -> Self {
        self.rnd = rnd;
        self
    }

    /// Builds the executor.
    #[must_use]
    pub fn build(self) -> RetryExecutor {
        RetryExecutor {
            telemetry: self.context.create_telemetry(self.name.clone(), STRATEGY_NAME),
            name: self.name,
            policy: self.policy,
            clock: self.context.clock().clone(),
            rnd: self.rnd,
            handle_unavailable: self.handle_unavailable,
            on_retry: self.on_retry,
        }
    }
}
