// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Default number of concurrent permits.
pub(crate) const DEFAULT_CAPACITY: usize = 64;

/// Default number of callers allowed to wait for a permit; zero rejects immediately when full.
pub(crate) const DEFAULT_MAX_QUEUE: usize = 0;
