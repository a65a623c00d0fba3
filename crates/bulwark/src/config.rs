// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Plain-data configuration for guards.
//!
//! [`GuardConfig`] groups the settings of the three strategies so that guards can be described
//! in configuration files. With the `serde` feature enabled every type here implements
//! `Serialize` and `Deserialize`; missing fields take their default values. Durations are written
//! in the ISO 8601 duration format (for example `"PT1.5S"`); the friendly format understood by
//! `jiff` (`"1.5s"`, `"100ms"`) is accepted as well.
//!
//! ```rust
//! use bulwark::config::GuardConfig;
//! use bulwark::{Guard, GuardContext};
//! use tick::Clock;
//!
//! # fn example(clock: Clock) {
//! let mut config = GuardConfig::default();
//! config.breaker.failure_threshold = 3;
//! config.retry.max_attempts = 4;
//! config.bulkhead.capacity = 16;
//!
//! let guard = Guard::from_config("billing", &config, &GuardContext::new(&clock));
//! # }
//! ```

use std::time::Duration;

use crate::breaker::{DEFAULT_FAILURE_THRESHOLD, DEFAULT_HALF_OPEN_MAX_PROBES, DEFAULT_MINIMUM_REQUESTS, DEFAULT_RESET_TIMEOUT, TripPolicy};
use crate::bulkhead::{DEFAULT_CAPACITY, DEFAULT_MAX_QUEUE};
use crate::retry::{DEFAULT_INITIAL_BACKOFF, DEFAULT_JITTER_FRACTION, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF, DEFAULT_MULTIPLIER, RetryPolicy};

/// Settings for a whole [`Guard`][crate::Guard].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct GuardConfig {
    /// Circuit breaker settings.
    pub breaker: BreakerConfig,
    /// Retry settings.
    pub retry: RetryConfig,
    /// Bulkhead settings.
    pub bulkhead: BulkheadConfig,
}

/// Settings for a [`CircuitBreaker`][crate::breaker::CircuitBreaker].
///
/// The circuit trips after `failure_threshold` consecutive failures, unless `failure_ratio` is
/// set, in which case it trips once that share of at least `minimum_requests` completed calls
/// has failed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Share of failed calls, in `[0, 1]`, that opens the circuit. Replaces `failure_threshold`.
    pub failure_ratio: Option<f64>,
    /// Completed calls required before `failure_ratio` is evaluated.
    pub minimum_requests: u32,
    /// Time the circuit stays open before a probe is admitted.
    #[cfg_attr(feature = "serde", serde(with = "duration_serde"))]
    pub reset_timeout: Duration,
    /// Probes admitted, and successes required, while half-open.
    pub half_open_max_probes: u32,
    /// Period after which the counts of a closed circuit are cleared.
    #[cfg_attr(feature = "serde", serde(with = "option_duration_serde"))]
    pub sampling_duration: Option<Duration>,
}

impl BreakerConfig {
    /// The [`TripPolicy`] described by this configuration.
    #[must_use]
    pub fn to_trip_policy(&self) -> TripPolicy {
        match self.failure_ratio {
            Some(ratio) => TripPolicy::failure_ratio(ratio, self.minimum_requests),
            None => TripPolicy::consecutive_failures(self.failure_threshold),
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            failure_ratio: None,
            minimum_requests: DEFAULT_MINIMUM_REQUESTS,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
            half_open_max_probes: DEFAULT_HALF_OPEN_MAX_PROBES,
            sampling_duration: None,
        }
    }
}

/// Settings for a [`RetryExecutor`][crate::retry::RetryExecutor].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct RetryConfig {
    /// Total attempts, including the initial call.
    pub max_attempts: u32,
    /// Delay before the first retry.
    #[cfg_attr(feature = "serde", serde(with = "duration_serde"))]
    pub initial_backoff: Duration,
    /// Upper bound of any single delay.
    #[cfg_attr(feature = "serde", serde(with = "duration_serde"))]
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Relative jitter applied to each delay, in `[0, 1]`.
    pub jitter_fraction: f64,
    /// Whether errors classified as unavailable are retried.
    pub handle_unavailable: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            multiplier: DEFAULT_MULTIPLIER,
            jitter_fraction: DEFAULT_JITTER_FRACTION,
            handle_unavailable: false,
        }
    }
}

impl RetryConfig {
    /// The [`RetryPolicy`] described by this configuration.
    #[must_use]
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .max_attempts(self.max_attempts)
            .initial_backoff(self.initial_backoff)
            .max_backoff(self.max_backoff)
            .multiplier(self.multiplier)
            .jitter_fraction(self.jitter_fraction)
    }
}

/// Settings for a [`Bulkhead`][crate::bulkhead::Bulkhead].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct BulkheadConfig {
    /// Concurrent permits.
    pub capacity: usize,
    /// Callers allowed to wait when all permits are in use.
    pub max_queue: usize,
    /// Longest wait for a permit; unbounded when absent.
    #[cfg_attr(feature = "serde", serde(with = "option_duration_serde"))]
    pub max_wait: Option<Duration>,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_queue: DEFAULT_MAX_QUEUE,
            max_wait: None,
        }
    }
}

#[cfg(feature = "serde")]
mod duration_serde {
    use std::time::Duration;

    use jiff::SignedDuration;
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        SignedDuration::try_from(*value).map_err(S::Error::custom)?.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Duration::try_from(SignedDuration::deserialize(deserializer)?).map_err(D::Error::custom)
    }
}

#[cfg(feature = "serde")]
mod option_duration_serde {
    use std::time::Duration;

    use jiff::SignedDuration;
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        value
            .map(SignedDuration::try_from)
            .transpose()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<SignedDuration>::deserialize(deserializer)?
            .map(Duration::try_from)
            .transpose()
            .map_err(D::Error::custom)
    }
}
