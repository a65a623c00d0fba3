// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use recoverable::RecoveryInfo;

use super::circuit_breaker::BreakerShared;
use super::engine::{Outcome, Ticket};

/// Permission to make one call through a [`CircuitBreaker`][super::CircuitBreaker].
///
/// Obtained from [`CircuitBreaker::allow`][super::CircuitBreaker::allow]. Report the outcome of
/// the call exactly once by consuming the admission with [`record_success`](Self::record_success),
/// [`record_failure`](Self::record_failure) or [`record`](Self::record).
///
/// Dropping an admission without recording an outcome (for example because the caller was
/// cancelled) leaves the statistics untouched and frees its half-open probe slot.
#[must_use = "the outcome of an admitted call must be recorded"]
#[derive(Debug)]
pub struct Admission {
    shared: Arc<BreakerShared>,
    ticket: Ticket,
    completed: bool,
}

impl Admission {
    pub(super) fn new(shared: Arc<BreakerShared>, ticket: Ticket) -> Self {
        Self {
            shared,
            ticket,
            completed: false,
        }
    }

    /// Returns true if this call is a half-open probe.
    #[must_use]
    pub fn is_probe(&self) -> bool {
        self.ticket.probe
    }

    /// Records that the call succeeded.
    pub fn record_success(self) {
        self.complete(Outcome::Success);
    }

    /// Records that the call failed.
    pub fn record_failure(self) {
        self.complete(Outcome::Failure);
    }

    /// Records the outcome described by `recovery`.
    ///
    /// [`RecoveryKind::Retry`][recoverable::RecoveryKind::Retry] and
    /// [`RecoveryKind::Unavailable`][recoverable::RecoveryKind::Unavailable] count as failures,
    /// any other classification counts as a success.
    pub fn record(self, recovery: &RecoveryInfo) {
        self.complete(Outcome::from_recovery(recovery));
    }

    fn complete(mut self, outcome: Outcome) {
        self.completed = true;
        self.shared.exit(self.ticket, outcome);
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        if !self.completed {
            self.shared.abandon(self.ticket);
        }
    }
}
