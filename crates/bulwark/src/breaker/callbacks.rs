// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{Counts, StateChangeArgs};
use crate::utils::define_fn_wrapper;

define_fn_wrapper!(ReadyToTrip(Fn(&Counts) -> bool));
define_fn_wrapper!(OnStateChange(Fn(StateChangeArgs<'_>)));
