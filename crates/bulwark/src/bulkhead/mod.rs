// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Concurrency limits for calls to a dependency.
//!
//! A [`Bulkhead`] isolates a dependency by capping how many calls to it may be in flight at
//! once, so that a slow dependency cannot exhaust the caller's resources.

mod builder;
mod constants;
mod error;
mod limiter;
mod permit;
mod telemetry;

pub use builder::BulkheadBuilder;
pub(crate) use constants::{DEFAULT_CAPACITY, DEFAULT_MAX_QUEUE};
pub use error::AcquireError;
pub use limiter::Bulkhead;
pub use permit::BulkheadPermit;
