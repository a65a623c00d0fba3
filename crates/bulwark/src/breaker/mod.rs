// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Circuit breaker that stops calling a failing dependency and probes it for recovery.
//!
//! Build a [`CircuitBreaker`] with [`CircuitBreaker::builder`], then ask it for an [`Admission`]
//! before every call and record the outcome on the admission. The [`Guard`][crate::Guard] does
//! this automatically.
//!
//! # Defaults
//!
//! | Parameter | Default |
//! |-----------|---------|
//! | Trip policy | 5 consecutive failures |
//! | Reset timeout | 5 seconds |
//! | Half-open probes | 1 |
//! | Sampling duration | none |

mod admission;
mod args;
mod builder;
mod callbacks;
mod circuit_breaker;
mod constants;
mod counts;
mod engine;
mod snapshot;
mod state;
mod telemetry;
mod trip_policy;

pub use admission::Admission;
pub use args::StateChangeArgs;
pub use builder::CircuitBreakerBuilder;
pub use circuit_breaker::CircuitBreaker;
pub(crate) use constants::{DEFAULT_FAILURE_THRESHOLD, DEFAULT_HALF_OPEN_MAX_PROBES, DEFAULT_MINIMUM_REQUESTS, DEFAULT_RESET_TIMEOUT};
pub use counts::Counts;
pub use snapshot::BreakerSnapshot;
pub use state::CircuitState;
pub use trip_policy::TripPolicy;
