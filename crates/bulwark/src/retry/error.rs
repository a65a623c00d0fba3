// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

use crate::{CancelledError, GuardError, OperationError};

/// Failure of [`RetryExecutor::execute`][super::RetryExecutor::execute].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RetryError<E> {
    /// The last attempt failed and no further attempt was allowed.
    #[error(transparent)]
    Operation(#[from] OperationError<E>),

    /// The cancellation token fired before the operation succeeded.
    #[error(transparent)]
    Cancelled(#[from] CancelledError),
}

impl<E> RetryError<E> {
    /// How many times the operation was invoked.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Operation(e) => e.attempts(),
            Self::Cancelled(e) => e.attempts(),
        }
    }
}

impl<E> From<RetryError<E>> for GuardError<E> {
    fn from(error: RetryError<E>) -> Self {
        match error {
            RetryError::Operation(e) => Self::Operation(e),
            RetryError::Cancelled(e) => Self::Cancelled(e),
        }
    }
}
