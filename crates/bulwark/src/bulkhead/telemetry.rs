// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub(super) const STRATEGY_NAME: &str = "bulkhead";

#[cfg(any(feature = "metrics", test))]
pub(super) const BULKHEAD_REJECTED_EVENT_NAME: &str = "bulkhead_rejected";

/// Attribute key for the reason a permit was refused.
#[cfg(any(feature = "metrics", test))]
pub(super) const BULKHEAD_REASON: &str = "resilience.bulkhead.reason";
