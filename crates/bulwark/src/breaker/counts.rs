// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Call statistics of a circuit breaker since its last state change.
///
/// Counts are cleared whenever the circuit changes state and, when a sampling duration is
/// configured, whenever the sampling window of a closed circuit elapses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    requests: u32,
    total_successes: u32,
    total_failures: u32,
    consecutive_successes: u32,
    consecutive_failures: u32,
}

impl Counts {
    /// Number of calls admitted.
    #[must_use]
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Number of calls that completed successfully.
    #[must_use]
    pub fn total_successes(&self) -> u32 {
        self.total_successes
    }

    /// Number of calls that failed.
    #[must_use]
    pub fn total_failures(&self) -> u32 {
        self.total_failures
    }

    /// Number of successes since the last failure.
    #[must_use]
    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    /// Number of failures since the last success.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Number of calls with a recorded outcome.
    #[must_use]
    pub fn completed(&self) -> u32 {
        self.total_successes.saturating_add(self.total_failures)
    }

    pub(crate) fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    pub(crate) fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    pub(crate) fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}
