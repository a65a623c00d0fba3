// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::Display;
use std::time::Duration;

use recoverable::{Recovery, RecoveryInfo};
use thiserror::Error;

use crate::breaker::CircuitState;

/// The circuit breaker rejected the call without invoking the operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit breaker '{name}' is {state}, call rejected")]
pub struct CircuitOpenError {
    name: Cow<'static, str>,
    state: CircuitState,
    retry_after: Option<Duration>,
}

impl CircuitOpenError {
    pub(crate) fn new(name: Cow<'static, str>, state: CircuitState, retry_after: Option<Duration>) -> Self {
        Self { name, state, retry_after }
    }

    /// The dependency name of the breaker that rejected the call.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The breaker state at the time of rejection.
    ///
    /// This is [`CircuitState::Open`] or [`CircuitState::HalfOpen`] when all probe slots are taken.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Remaining time until the breaker admits a probe, when known.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

/// Why a [`Bulkhead`][crate::bulkhead::Bulkhead] refused to hand out a permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum BulkheadFullReason {
    /// All permits are in use and waiting is not configured.
    AtCapacity,

    /// All permits are in use and the wait queue is full.
    QueueFull,

    /// The caller waited for the configured maximum time without getting a permit.
    WaitTimedOut,
}

impl BulkheadFullReason {
    /// Returns the `snake_case` name of the reason.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AtCapacity => "at_capacity",
            Self::QueueFull => "queue_full",
            Self::WaitTimedOut => "wait_timed_out",
        }
    }
}

impl Display for BulkheadFullReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The bulkhead had no free permit for the call.
///
/// Surfaced by the [`Guard`][crate::Guard] as [`GuardError::ResourceExhausted`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bulkhead '{name}' with capacity {capacity} rejected the call: {reason}")]
pub struct BulkheadFullError {
    name: Cow<'static, str>,
    capacity: usize,
    reason: BulkheadFullReason,
}

impl BulkheadFullError {
    pub(crate) fn new(name: Cow<'static, str>, capacity: usize, reason: BulkheadFullReason) -> Self {
        Self { name, capacity, reason }
    }

    /// The dependency name of the bulkhead.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured number of concurrent permits.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Why the permit was refused.
    #[must_use]
    pub fn reason(&self) -> BulkheadFullReason {
        self.reason
    }
}

/// The caller's cancellation token fired before the call completed.
///
/// [`attempts`](Self::attempts) counts invocations of the operation, so `0` means the operation
/// never ran: the token was already cancelled, or it fired while waiting for a bulkhead permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("call cancelled after {attempts} attempt(s)")]
pub struct CancelledError {
    attempts: u32,
}

impl CancelledError {
    pub(crate) fn new(attempts: u32) -> Self {
        Self { attempts }
    }

    /// How many times the operation was invoked before cancellation was observed.
    ///
    /// Zero when cancellation was observed before the first invocation.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// The operation itself failed and no further attempt was made.
///
/// Carries the error of the last attempt, the total number of attempts and the
/// classification of the last error.
#[derive(Debug, Error)]
#[error("operation failed after {attempts} attempt(s)")]
pub struct OperationError<E> {
    #[source]
    error: E,
    attempts: u32,
    recovery: RecoveryInfo,
}

impl<E> OperationError<E> {
    pub(crate) fn new(error: E, attempts: u32, recovery: RecoveryInfo) -> Self {
        Self { error, attempts, recovery }
    }

    /// The error returned by the last attempt.
    #[must_use]
    pub fn error(&self) -> &E {
        &self.error
    }

    /// Consumes this error and returns the error of the last attempt.
    #[must_use]
    pub fn into_error(self) -> E {
        self.error
    }

    /// How many times the operation was invoked.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The classification of the last error.
    #[must_use]
    pub fn recovery(&self) -> &RecoveryInfo {
        &self.recovery
    }
}

/// Coarse category of a [`GuardError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// See [`GuardError::CircuitOpen`].
    CircuitOpen,
    /// See [`GuardError::ResourceExhausted`].
    ResourceExhausted,
    /// See [`GuardError::Cancelled`].
    Cancelled,
    /// See [`GuardError::Operation`].
    Operation,
}

/// Failure of a call made through a [`Guard`][crate::Guard].
///
/// # Examples
///
/// ```rust
/// use bulwark::{ErrorKind, GuardError};
///
/// fn describe(error: &GuardError<std::io::Error>) -> &'static str {
///     if error.is_fail_fast() {
///         return "dependency is shedding load";
///     }
///
///     match error.kind() {
///         ErrorKind::Cancelled => "caller gave up",
///         _ => "dependency call failed",
///     }
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GuardError<E> {
    /// The circuit breaker is open; the operation was not invoked.
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// The bulkhead had no free permit; the operation was not invoked.
    #[error(transparent)]
    ResourceExhausted(#[from] BulkheadFullError),

    /// The cancellation token fired.
    #[error(transparent)]
    Cancelled(#[from] CancelledError),

    /// The operation failed on its last attempt.
    #[error(transparent)]
    Operation(#[from] OperationError<E>),
}

impl<E> GuardError<E> {
    /// The category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CircuitOpen(_) => ErrorKind::CircuitOpen,
            Self::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Operation(_) => ErrorKind::Operation,
        }
    }

    /// Returns true when the guard rejected the call without invoking the operation because the
    /// dependency is unhealthy or saturated.
    #[must_use]
    pub fn is_fail_fast(&self) -> bool {
        matches!(self, Self::CircuitOpen(_) | Self::ResourceExhausted(_))
    }

    /// Returns the number of operation invocations, zero for rejected calls.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::CircuitOpen(_) | Self::ResourceExhausted(_) => 0,
            Self::Cancelled(e) => e.attempts(),
            Self::Operation(e) => e.attempts(),
        }
    }

    /// Returns the error produced by the operation, if the operation failed.
    #[must_use]
    pub fn into_source(self) -> Option<E> {
        match self {
            Self::Operation(e) => Some(e.into_error()),
            _ => None,
        }
    }
}

impl<E> Recovery for GuardError<E> {
    fn recovery(&self) -> RecoveryInfo {
        match self {
            Self::CircuitOpen(e) => match e.retry_after() {
                Some(delay) => RecoveryInfo::unavailable().delay(delay),
                None => RecoveryInfo::unavailable(),
            },
            Self::ResourceExhausted(_) => RecoveryInfo::unavailable(),
            Self::Cancelled(_) => RecoveryInfo::never(),
            Self::Operation(e) => e.recovery().clone(),
        }
    }
}
