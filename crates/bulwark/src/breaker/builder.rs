// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::Duration;

use super::callbacks::OnStateChange;
use super::constants::{DEFAULT_HALF_OPEN_MAX_PROBES, DEFAULT_RESET_TIMEOUT};
use super::engine::{Engine, EngineOptions};
use super::telemetry::STRATEGY_NAME;
use super::{CircuitBreaker, StateChangeArgs, TripPolicy};
use crate::GuardContext;
use crate::config::BreakerConfig;

/// Builder for [`CircuitBreaker`], created by [`CircuitBreaker::builder`].
///
/// Defaults:
///
/// | Option | Default |
/// |--------|---------|
/// | [`trip_policy`](Self::trip_policy) | 5 consecutive failures |
/// | [`reset_timeout`](Self::reset_timeout) | 5 seconds |
/// | [`half_open_max_probes`](Self::half_open_max_probes) | 1 |
/// | [`sampling_duration`](Self::sampling_duration) | none |
#[derive(Debug)]
pub struct CircuitBreakerBuilder {
    name: Cow<'static, str>,
    context: GuardContext,
    options: EngineOptions,
    on_state_change: Option<OnStateChange>,
}

impl CircuitBreakerBuilder {
    pub(super) fn new(name: Cow<'static, str>, context: &GuardContext) -> Self {
        Self {
            name,
            context: context.clone(),
            options: EngineOptions {
                trip_policy: TripPolicy::default(),
                reset_timeout: DEFAULT_RESET_TIMEOUT,
                half_open_max_probes: DEFAULT_HALF_OPEN_MAX_PROBES,
                sampling_duration: None,
            },
            on_state_change: None,
        }
    }

    /// Trips the circuit after `threshold` consecutive failures.
    ///
    /// Shorthand for `trip_policy(TripPolicy::consecutive_failures(threshold))`.
    #[must_use]
    pub fn failure_threshold(self, threshold: u32) -> Self {
        self.trip_policy(TripPolicy::consecutive_failures(threshold))
    }

    /// Sets the policy deciding when a closed circuit opens.
    #[must_use]
    pub fn trip_policy(mut self, policy: TripPolicy) -> Self {
        self.options.trip_policy = policy;
        self
    }

    /// Sets how long the circuit stays open before the next call is admitted as a probe.
    #[must_use]
    pub fn reset_timeout(mut self, reset_timeout: Duration) -> Self {
        self.options.reset_timeout = reset_timeout;
        self
    }

    /// Sets how many probes are admitted while half-open. The same number of successful probes
    /// closes the circuit. Zero is treated as one.
    #[must_use]
    pub fn half_open_max_probes(mut self, probes: u32) -> Self {
        self.options.half_open_max_probes = probes.max(1);
        self
    }

    /// Clears the counts of a closed circuit every `sampling_duration`, so that failures spread
    /// over a long period do not trip it. `None` or a zero duration disables the window.
    #[must_use]
    pub fn sampling_duration(mut self, sampling_duration: impl Into<Option<Duration>>) -> Self {
        self.options.sampling_duration = sampling_duration.into().filter(|d| !d.is_zero());
        self
    }

    /// Registers a callback invoked on every state transition.
    ///
    /// The callback runs synchronously on the thread that caused the transition, after the
    /// internal lock has been released.
    #[must_use]
    pub fn on_state_change(mut self, callback: impl Fn(StateChangeArgs<'_>) + Send + Sync + 'static) -> Self {
        self.on_state_change = Some(OnStateChange::new(callback));
        self
    }

    /// Applies the values of a [`BreakerConfig`].
    #[must_use]
    pub fn config(self, config: &BreakerConfig) -> Self {
        self.trip_policy(config.to_trip_policy())
            .reset_timeout(config.reset_timeout)
            .half_open_max_probes(config.half_open_max_probes)
            .sampling_duration(config.sampling_duration)
    }

    /// Builds the breaker.
    #[must_use]
    pub fn build(self) -> CircuitBreaker {
        let telemetry = self.context.create_telemetry(self.name.clone(), STRATEGY_NAME);
        let engine = Engine::new(self.options, self.context.clock().clone());

        CircuitBreaker::new(self.name, engine, self.on_state_change, telemetry)
    }
}
