// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use super::backoff::DelaysIter;
use super::constants::{DEFAULT_INITIAL_BACKOFF, DEFAULT_JITTER_FRACTION, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF, DEFAULT_MULTIPLIER};
use crate::rnd::Rnd;

/// How many times to attempt an operation and how long to wait between attempts.
///
/// The delay before retry `n` (0-based) is `min(max_backoff, initial_backoff * multiplier^n)`,
/// randomized uniformly within `±jitter_fraction` of that value and clamped to
/// `[0, max_backoff]`.
///
/// | Option | Default |
/// |--------|---------|
/// | [`max_attempts`](Self::max_attempts) | 3 |
/// | [`initial_backoff`](Self::initial_backoff) | 100 ms |
/// | [`max_backoff`](Self::max_backoff) | 10 s |
/// | [`multiplier`](Self::multiplier) | 2.0 |
/// | [`jitter_fraction`](Self::jitter_fraction) | 0.0 |
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use bulwark::retry::RetryPolicy;
///
/// let policy = RetryPolicy::new()
///     .max_attempts(4)
///     .initial_backoff(Duration::from_millis(50))
///     .max_backoff(Duration::from_secs(1))
///     .jitter_fraction(0.0);
///
/// assert_eq!(policy.backoff(0), Duration::from_millis(50));
/// assert_eq!(policy.backoff(2), Duration::from_millis(200));
/// assert_eq!(policy.backoff(10), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
    jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy {
    /// Creates a policy with the default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            multiplier: DEFAULT_MULTIPLIER,
            jitter_fraction: DEFAULT_JITTER_FRACTION,
        }
    }

    /// Sets the total number of attempts, including the initial call. Zero is treated as one.
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub fn initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Sets the upper bound of any single delay, including delays suggested by errors.
    #[must_use]
    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Sets the growth factor between consecutive delays. Values below `1.0` (and `NaN`) are treated as `1.0`.
    #[must_use]
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = if multiplier.is_nan() { 1.0 } else { multiplier.max(1.0) };
        self
    }

    /// Sets the relative jitter applied to each delay. Clamped to `[0.0, 1.0]`; `NaN` disables jitter.
    #[must_use]
    pub fn jitter_fraction(mut self, jitter_fraction: f64) -> Self {
        self.jitter_fraction = if jitter_fraction.is_nan() {
            0.0
        } else {
            jitter_fraction.clamp(0.0, 1.0)
        };
        self
    }

    /// Returns the total number of attempts.
    #[must_use]
    pub fn get_max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay before the first retry.
    #[must_use]
    pub fn get_initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// Returns the upper bound of any single delay.
    #[must_use]
    pub fn get_max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Returns the growth factor between consecutive delays.
    #[must_use]
    pub fn get_multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Returns the relative jitter.
    #[must_use]
    pub fn get_jitter_fraction(&self) -> f64 {
        self.jitter_fraction
    }

    /// Returns the delay before retry `retry_index` (0-based) without jitter.
    #[must_use]
    pub fn backoff(&self, retry_index: u32) -> Duration {
        super::backoff::exponential(self.initial_backoff, self.multiplier, retry_index, self.max_backoff)
    }

    pub(crate) fn delays(&self, rnd: Rnd) -> DelaysIter {
        DelaysIter::new(self.clone(), rnd)
    }
}
