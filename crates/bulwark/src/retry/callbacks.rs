// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::OnRetryArgs;
use crate::utils::define_fn_wrapper;

define_fn_wrapper!(OnRetry(Fn(OnRetryArgs)));
