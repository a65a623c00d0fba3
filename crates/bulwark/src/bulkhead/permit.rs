// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use tokio::sync::OwnedSemaphorePermit;

/// A slot in a [`Bulkhead`][super::Bulkhead].
///
/// The slot is returned when the permit is dropped, or explicitly with [`release`](Self::release).
#[derive(Debug)]
#[must_use = "the bulkhead slot is released as soon as the permit is dropped"]
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
}

impl BulkheadPermit {
    pub(super) fn new(permit: OwnedSemaphorePermit) -> Self {
        Self { _permit: permit }
    }

    /// Returns the slot to the bulkhead.
    pub fn release(self) {
        drop(self);
    }
}
