// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Default total number of attempts, including the initial call.
pub(crate) const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub(crate) const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Default upper bound of any single delay.
pub(crate) const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Default growth factor between consecutive delays.
pub(crate) const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Default relative jitter; delays follow the exponential curve exactly unless jitter is set.
pub(crate) const DEFAULT_JITTER_FRACTION: f64 = 0.0;
