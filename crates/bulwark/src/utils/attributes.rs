// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Key used to annotate the name of the protected dependency.
///
/// Values should be short, preferably in `snake_case`. Examples: `inventory`, `payments_api`.
pub(crate) const DEPENDENCY_NAME: &str = "resilience.dependency.name";

/// Key used to annotate the name of a resilience strategy.
///
/// Examples: `retry`, `circuit_breaker`, `bulkhead`.
pub(crate) const STRATEGY_NAME: &str = "resilience.strategy.name";

/// Key used to annotate the specific resilience event being emitted.
///
/// Examples: `retry`, `circuit_opened`, `bulkhead_rejected`.
pub(crate) const EVENT_NAME: &str = "resilience.event.name";
