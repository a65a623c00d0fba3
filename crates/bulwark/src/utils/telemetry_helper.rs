// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Per-component telemetry handles created by [`GuardContext`][crate::GuardContext].
#[derive(Debug, Clone)]
pub(crate) struct TelemetryHelper {
    #[cfg(any(feature = "metrics", feature = "logs", test))]
    pub(crate) dependency_name: std::borrow::Cow<'static, str>,
    #[cfg(any(feature = "metrics", feature = "logs", test))]
    pub(crate) strategy_name: &'static str,
    #[cfg(any(feature = "metrics", test))]
    pub(crate) event_reporter: Option<opentelemetry::metrics::Counter<u64>>,
    #[cfg(any(feature = "logs", test))]
    pub(crate) logs_enabled: bool,
}

#[cfg(any(feature = "metrics", test))]
impl TelemetryHelper {
    pub(crate) fn metrics_enabled(&self) -> bool {
        self.event_reporter.is_some()
    }

    /// Increments the resilience event counter, tagging it with the dependency, strategy and event names.
    pub(crate) fn report_event(&self, event_name: &'static str, attributes: &[opentelemetry::KeyValue]) {
        use opentelemetry::KeyValue;

        use crate::utils::{DEPENDENCY_NAME, EVENT_NAME, STRATEGY_NAME};

        let Some(reporter) = &self.event_reporter else {
            return;
        };

        let mut all = Vec::with_capacity(attributes.len() + 3);
        all.push(KeyValue::new(DEPENDENCY_NAME, self.dependency_name.clone()));
        all.push(KeyValue::new(STRATEGY_NAME, self.strategy_name));
        all.push(KeyValue::new(EVENT_NAME, event_name));
        all.extend_from_slice(attributes);

        reporter.add(1, &all);
    }
}
