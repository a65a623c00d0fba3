// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

use crate::{BulkheadFullError, CancelledError, GuardError};

/// Failure of [`Bulkhead::acquire`][super::Bulkhead::acquire].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AcquireError {
    /// No permit could be handed out.
    #[error(transparent)]
    Full(#[from] BulkheadFullError),

    /// The cancellation token fired while waiting for a permit.
    #[error(transparent)]
    Cancelled(#[from] CancelledError),
}

impl<E> From<AcquireError> for GuardError<E> {
    fn from(error: AcquireError) -> Self {
        match error {
            AcquireError::Full(e) => Self::ResourceExhausted(e),
            AcquireError::Cancelled(e) => Self::Cancelled(e),
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BulkheadFullReason, ErrorKind};

    #[test]
    fn converts_into_guard_error() {
        let full = AcquireError::Full(BulkheadFullError::new("db".into(), 4, BulkheadFullReason::QueueFull));
        let error: GuardError<std::io::Error> = full.into();
        assert_eq!(error.kind(), ErrorKind::ResourceExhausted);
        assert!(error.is_fail_fast());

        let cancelled = AcquireError::Cancelled(CancelledError::new(0));
        let error: GuardError<std::io::Error> = cancelled.into();
        assert_eq!(error.kind(), ErrorKind::Cancelled);
        assert_eq!(error.attempts(), 0);
    }

    #[test]
    fn display_is_transparent() {
        let error = AcquireError::Full(BulkheadFullError::new("db".into(), 4, BulkheadFullReason::AtCapacity));

        assert_eq!(error.to_string(), "bulkhead 'db' with capacity 4 rejected the call: at_capacity");
    }
}
