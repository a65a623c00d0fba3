// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Default number of consecutive failures that trips a closed circuit.
pub(crate) const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Default number of completed calls before a failure ratio is evaluated.
pub(crate) const DEFAULT_MINIMUM_REQUESTS: u32 = 10;

/// Default time the circuit stays open before a probe is admitted.
pub(crate) const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of probes admitted, and successes required, while half-open.
pub(crate) const DEFAULT_HALF_OPEN_MAX_PROBES: u32 = 1;

pub(crate) const ERR_POISONED_LOCK: &str =
    "poisoned lock - cannot continue execution because circuit breaker state can no longer be trusted";
