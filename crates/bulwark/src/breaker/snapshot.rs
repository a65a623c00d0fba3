// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Instant;

use super::{CircuitState, Counts};

/// Point-in-time view of a circuit breaker, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct BreakerSnapshot {
    pub(crate) state: CircuitState,
    pub(crate) counts: Counts,
    pub(crate) half_open_successes: u32,
    pub(crate) last_transition: Instant,
}

impl BreakerSnapshot {
    /// The state of the circuit.
    ///
    /// An open circuit whose reset timeout has elapsed still reports [`CircuitState::Open`] until
    /// the next call attempt moves it to half-open.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Counts accumulated since the last state change.
    #[must_use]
    pub fn counts(&self) -> Counts {
        self.counts
    }

    /// Successful probes since the circuit became half-open; zero in other states.
    #[must_use]
    pub fn half_open_successes(&self) -> u32 {
        self.half_open_successes
    }

    /// The instant of the most recent state change, or of creation.
    #[must_use]
    pub fn last_transition(&self) -> Instant {
        self.last_transition
    }
}
