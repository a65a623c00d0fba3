// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub(super) const STRATEGY_NAME: &str = "circuit_breaker";

#[cfg(any(feature = "metrics", test))]
pub(super) const CIRCUIT_OPENED_EVENT_NAME: &str = "circuit_opened";
#[cfg(any(feature = "metrics", test))]
pub(super) const CIRCUIT_HALF_OPENED_EVENT_NAME: &str = "circuit_half_opened";
#[cfg(any(feature = "metrics", test))]
pub(super) const CIRCUIT_CLOSED_EVENT_NAME: &str = "circuit_closed";
#[cfg(any(feature = "metrics", test))]
pub(super) const CIRCUIT_REJECTED_EVENT_NAME: &str = "circuit_rejected";
#[cfg(any(feature = "metrics", test))]
pub(super) const CIRCUIT_PROBE_EVENT_NAME: &str = "circuit_probe";

/// Attribute key for the circuit state after the event.
#[cfg(any(feature = "metrics", test))]
pub(super) const CIRCUIT_STATE: &str = "resilience.circuit_breaker.state";

/// Attribute key for the result of a half-open probe.
#[cfg(any(feature = "metrics", test))]
pub(super) const CIRCUIT_PROBE_RESULT: &str = "resilience.circuit_breaker.probe.result";
