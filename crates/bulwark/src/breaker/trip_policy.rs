// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::Counts;
use super::callbacks::ReadyToTrip;
use super::constants::DEFAULT_FAILURE_THRESHOLD;

/// Decides when a closed circuit trips open.
///
/// The policy is evaluated after every failure recorded while the circuit is closed:
///
/// - [`TripPolicy::consecutive_failures`]: trips after `n` failures in a row (default, `n = 5`).
/// - [`TripPolicy::failure_ratio`]: trips once the share of failed calls reaches a ratio, after a
///   minimum number of completed calls.
/// - [`TripPolicy::custom`]: trips when a user supplied predicate over [`Counts`] returns `true`.
///
/// # Examples
///
/// ```rust
/// use bulwark::breaker::TripPolicy;
///
/// // Trip once half of at least 20 calls have failed.
/// let policy = TripPolicy::failure_ratio(0.5, 20);
///
/// // Trip after 3 failures, but only when the dependency saw real traffic.
/// let policy = TripPolicy::custom(|counts| counts.consecutive_failures() >= 3 && counts.requests() >= 10);
/// ```
#[derive(Debug, Clone)]
pub struct TripPolicy {
    inner: Mode,
}

#[derive(Debug, Clone)]
enum Mode {
    ConsecutiveFailures(u32),
    FailureRatio { ratio: f64, min_requests: u32 },
    Custom(ReadyToTrip),
}

impl TripPolicy {
    /// Trips after `threshold` consecutive failures. A threshold of zero is treated as one.
    #[must_use]
    pub fn consecutive_failures(threshold: u32) -> Self {
        Self {
            inner: Mode::ConsecutiveFailures(threshold.max(1)),
        }
    }

    /// Trips once `failures / completed >= ratio` and at least `min_requests` calls have completed.
    ///
    /// The ratio is clamped to `[0.0, 1.0]`; `NaN` is treated as `1.0`. With no completed calls the
    /// circuit never trips.
    #[must_use]
    pub fn failure_ratio(ratio: f64, min_requests: u32) -> Self {
        let ratio = if ratio.is_nan() { 1.0 } else { ratio.clamp(0.0, 1.0) };

        Self {
            inner: Mode::FailureRatio { ratio, min_requests },
        }
    }

    /// Trips when `ready_to_trip` returns `true` for the current counts.
    #[must_use]
    pub fn custom(ready_to_trip: impl Fn(&Counts) -> bool + Send + Sync + 'static) -> Self {
        Self {
            inner: Mode::Custom(ReadyToTrip::new(ready_to_trip)),
        }
    }

    pub(crate) fn ready_to_trip(&self, counts: &Counts) -> bool {
        match &self.inner {
            Mode::ConsecutiveFailures(threshold) => counts.consecutive_failures() >= *threshold,
            Mode::FailureRatio { ratio, min_requests } => {
                let completed = counts.completed();

                if completed == 0 || completed < *min_requests {
                    return false;
                }

                f64::from(counts.total_failures()) / f64::from(completed) >= *ratio
            }
            Mode::Custom(ready_to_trip) => ready_to_trip.call(counts),
        }
    }
}

impl Default for TripPolicy {
    fn default() -> Self {
        Self::consecutive_failures(DEFAULT_FAILURE_THRESHOLD)
    }
}
