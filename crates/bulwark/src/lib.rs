// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Guards for calls to unreliable dependencies.
//!
//! This crate protects calls to a downstream collaborator (a remote service, a database, a queue)
//! by combining three classic resilience mechanisms around a user supplied operation:
//!
//! - [`Bulkhead`][bulkhead::Bulkhead] bounds the number of concurrent in-flight calls.
//! - [`CircuitBreaker`][breaker::CircuitBreaker] stops calling a dependency that keeps failing
//!   and probes it again after a cool-down period.
//! - [`RetryExecutor`][retry::RetryExecutor] re-runs transient failures with exponential backoff
//!   and jitter.
//!
//! The [`Guard`] composes them in the order bulkhead, circuit breaker, retry, operation and maps
//! every failure to a [`GuardError`].
//!
//! # Runtime Agnostic Design
//!
//! All timing goes through a [`tick::Clock`] and every wait observes a [`CancellationToken`], so
//! the crate works with any async runtime. The guard never originates timeouts on its own; cancel
//! the token to abandon a call.
//!
//! # Recovery Classification
//!
//! Whether a failure is worth retrying is described by [`RecoveryInfo`] from the `recoverable`
//! crate. Errors implementing [`Recovery`] can be passed straight to [`Guard::execute`]; other
//! errors are classified by a closure passed to [`Guard::execute_with`].
//!
//! - [`RecoveryKind::Retry`]: transient failure, retried and counted as a breaker failure.
//! - [`RecoveryKind::Unavailable`]: the dependency is down, counted as a breaker failure and only
//!   retried when enabled.
//! - [`RecoveryKind::Never`] / [`RecoveryKind::Unknown`]: the request itself was at fault; returned
//!   immediately and not held against the dependency.
//!
//! # Example
//!
//! ```rust
//! use std::io;
//!
//! use bulwark::{CancellationToken, Guard, GuardContext, classify_io_error};
//! use tick::Clock;
//!
//! # async fn example(clock: Clock) -> Result<(), bulwark::GuardError<io::Error>> {
//! let context = GuardContext::new(&clock);
//! let guard = Guard::builder("inventory", &context).build();
//! let cancel = CancellationToken::new();
//!
//! let stock = guard
//!     .execute_with(|| async { Ok::<_, io::Error>(42) }, classify_io_error, &cancel)
//!     .await?;
//!
//! assert_eq!(stock, 42);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `logs`: emits structured `tracing` events for resilience events.
//! - `metrics`: reports the `resilience.event` counter through OpenTelemetry.
//! - `serde`: serialization of [`config::GuardConfig`].

pub use recoverable::{Recovery, RecoveryInfo, RecoveryKind};
pub use tokio_util::sync::CancellationToken;

mod attempt;
pub use attempt::Attempt;

mod context;
pub use context::GuardContext;

mod error;
pub use error::{BulkheadFullError, BulkheadFullReason, CancelledError, CircuitOpenError, ErrorKind, GuardError, OperationError};

mod io;
pub use io::classify_io_error;

pub mod breaker;
pub mod bulkhead;
pub mod config;
pub mod retry;

mod guard;
pub use guard::{Guard, GuardBuilder, GuardRegistry};

#[cfg(any(feature = "metrics", test))]
mod metrics;

mod rnd;
mod utils;

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
pub(crate) mod testing;
