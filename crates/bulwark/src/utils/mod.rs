// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod define_fn_wrapper;
pub(crate) use define_fn_wrapper::define_fn_wrapper;

#[cfg(any(feature = "metrics", test))]
mod attributes;
#[cfg(any(feature = "metrics", test))]
pub(crate) use attributes::*;

mod telemetry_helper;
pub(crate) use telemetry_helper::TelemetryHelper;

/// Converts seconds to a [`Duration`](std::time::Duration), saturating instead of panicking.
///
/// Negative and `NaN` inputs map to zero, overflowing inputs map to [`Duration::MAX`](std::time::Duration::MAX).
pub(crate) fn secs_to_duration_saturating(secs: f64) -> std::time::Duration {
    if secs.is_nan() || secs <= 0.0 {
        return std::time::Duration::ZERO;
    }

    std::time::Duration::try_from_secs_f64(secs).unwrap_or(std::time::Duration::MAX)
}
