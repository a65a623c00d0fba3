// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub(super) const STRATEGY_NAME: &str = "retry";

/// The name of the retry event for telemetry reporting.
#[cfg(any(feature = "metrics", test))]
pub(super) const RETRY_EVENT: &str = "retry";

/// Attribute key for the index of the attempt that failed.
#[cfg(any(feature = "metrics", test))]
pub(super) const ATTEMPT_INDEX: &str = "resilience.attempt.index";

/// Attribute key for the recovery kind that triggered the retry.
#[cfg(any(feature = "metrics", test))]
pub(super) const RECOVERY_KIND: &str = "resilience.recovery.kind";
