// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

use tick::Clock;

/// Shared dependencies for breakers, bulkheads, retry executors and guards.
///
/// A context carries the [`Clock`] used for every time read and delay, plus the telemetry
/// configuration. Build one per application (or per test) and pass it to every builder.
///
/// # Examples
///
/// ```rust
/// use bulwark::GuardContext;
/// use tick::Clock;
///
/// # fn example(clock: Clock) {
/// let context = GuardContext::new(&clock);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GuardContext {
    clock: Clock,
    #[cfg(any(feature = "metrics", test))]
    meter: Option<opentelemetry::metrics::Meter>,
    #[cfg(any(feature = "logs", test))]
    logs_enabled: bool,
}

impl GuardContext {
    /// Creates a context with the given clock. Logs and metrics start disabled.
    pub fn new(clock: impl AsRef<Clock>) -> Self {
        Self {
            clock: clock.as_ref().clone(),
            #[cfg(any(feature = "metrics", test))]
            meter: None,
            #[cfg(any(feature = "logs", test))]
            logs_enabled: false,
        }
    }

    /// Enables reporting of the `resilience.event` counter through the given meter provider.
    #[must_use]
    #[cfg(any(feature = "metrics", test))]
    pub fn enable_metrics(self, provider: &dyn opentelemetry::metrics::MeterProvider) -> Self {
        Self {
            meter: Some(crate::metrics::create_meter(provider)),
            ..self
        }
    }

    /// Enables structured `tracing` events for resilience events.
    #[must_use]
    #[cfg(any(feature = "logs", test))]
    pub fn enable_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    /// The clock used for timing.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(unused_variables, reason = "unused when neither logs nor metrics are enabled")
    )]
    pub(crate) fn create_telemetry(&self, dependency_name: Cow<'static, str>, strategy_name: &'static str) -> crate::utils::TelemetryHelper {
        crate::utils::TelemetryHelper {
            #[cfg(any(feature = "metrics", feature = "logs", test))]
            dependency_name,
            #[cfg(any(feature = "metrics", feature = "logs", test))]
            strategy_name,
            #[cfg(any(feature = "metrics", test))]
            event_reporter: self.meter.as_ref().map(crate::metrics::create_resilience_event_counter),
            #[cfg(any(feature = "logs", test))]
            logs_enabled: self.logs_enabled,
        }
    }
}

impl AsRef<Clock> for GuardContext {
    fn as_ref(&self) -> &Clock {
        &self.clock
    }
}
