// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;

/// A single attempt of an operation executed by a [`RetryExecutor`][crate::retry::RetryExecutor].
///
/// Attempts are 0-based: the initial call has index 0, the first retry has index 1, and so on.
///
/// # Examples
///
/// ```
/// use bulwark::Attempt;
///
/// let attempt = Attempt::new(0, false);
/// assert!(attempt.is_first());
/// assert!(!attempt.is_last());
/// assert_eq!(attempt.number(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    index: u32,
    is_last: bool,
}

impl Default for Attempt {
    fn default() -> Self {
        Self::new(0, true)
    }
}

impl Attempt {
    /// Creates an attempt with the given 0-based index.
    #[must_use]
    pub fn new(index: u32, is_last: bool) -> Self {
        Self { index, is_last }
    }

    /// Returns the first attempt of an execution allowing `max_attempts` attempts in total.
    pub(crate) fn first(max_attempts: u32) -> Self {
        Self::new(0, max_attempts <= 1)
    }

    /// Returns true for the initial call.
    #[must_use]
    pub fn is_first(self) -> bool {
        self.index == 0
    }

    /// Returns true if no further attempt will be made after this one.
    #[must_use]
    pub fn is_last(self) -> bool {
        self.is_last
    }

    /// The 0-based attempt index.
    #[must_use]
    pub fn index(self) -> u32 {
        self.index
    }

    /// The 1-based attempt number, i.e. how many times the operation has been invoked.
    #[must_use]
    pub fn number(self) -> u32 {
        self.index.saturating_add(1)
    }

    /// Returns the next attempt, or `None` once `max_attempts` have been made.
    pub(crate) fn increment(self, max_attempts: u32) -> Option<Self> {
        let next = self.index.saturating_add(1);

        if next >= max_attempts {
            return None;
        }

        Some(Self::new(next, next == max_attempts.saturating_sub(1)))
    }
}

impl Display for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.index.fmt(f)
    }
}
