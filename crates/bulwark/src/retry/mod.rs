// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Bounded retries with exponential backoff and jitter.
//!
//! A [`RetryExecutor`] runs an async operation up to [`RetryPolicy::get_max_attempts`] times.
//! After each failure a caller supplied classifier maps the error to a
//! [`RecoveryInfo`][crate::RecoveryInfo]; only transient failures are retried.
//!
//! # Defaults
//!
//! | Parameter | Default |
//! |-----------|---------|
//! | Max attempts | 3 (initial call included) |
//! | Initial backoff | 100 ms |
//! | Max backoff | 10 s |
//! | Multiplier | 2.0 |
//! | Jitter | none |
//! | Retry unavailable | no |

mod args;
mod backoff;
mod builder;
mod callbacks;
mod constants;
mod error;
mod executor;
mod policy;
mod telemetry;

pub use args::OnRetryArgs;
pub use builder::RetryExecutorBuilder;
pub(crate) use constants::{DEFAULT_INITIAL_BACKOFF, DEFAULT_JITTER_FRACTION, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF, DEFAULT_MULTIPLIER};
pub use error::RetryError;
pub use executor::RetryExecutor;
pub use policy::RetryPolicy;
