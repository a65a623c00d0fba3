// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;

/// The state of a [`CircuitBreaker`][super::CircuitBreaker].
///
/// ```text
///            trip policy fires
///   Closed ─────────────────────► Open
///     ▲                          │  ▲
///     │ enough probe successes   │  │ any probe failure
///     │                          ▼  │
///     └──────────────────────── HalfOpen
///                 (reset timeout elapsed, next call is a probe)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CircuitState {
    /// Calls flow through and outcomes are counted.
    Closed,

    /// Calls are rejected without invoking the operation.
    Open,

    /// A limited number of probe calls test whether the dependency has recovered.
    HalfOpen,
}

impl CircuitState {
    /// Returns the `snake_case` name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
