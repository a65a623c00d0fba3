// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Instant;

use super::{CircuitState, Counts};

/// Arguments for the [`on_state_change`][super::CircuitBreakerBuilder::on_state_change] callback.
///
/// Provides context about a circuit state transition.
#[derive(Debug)]
#[non_exhaustive]
pub struct StateChangeArgs<'a> {
    pub(crate) name: &'a str,
    pub(crate) from: CircuitState,
    pub(crate) to: CircuitState,
    pub(crate) counts: Counts,
    pub(crate) at: Instant,
}

impl StateChangeArgs<'_> {
    /// Returns the dependency name of the breaker.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }

    /// Returns the state before the transition.
    #[must_use]
    pub fn from(&self) -> CircuitState {
        self.from
    }

    /// Returns the state after the transition.
    #[must_use]
    pub fn to(&self) -> CircuitState {
        self.to
    }

    /// Returns the counts accumulated in the previous state.
    #[must_use]
    pub fn counts(&self) -> Counts {
        self.counts
    }

    /// Returns the instant of the transition.
    #[must_use]
    pub fn at(&self) -> Instant {
        self.at
    }
}
