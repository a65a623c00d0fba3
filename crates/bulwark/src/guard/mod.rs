// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod builder;
mod composite;
mod registry;

pub use builder::GuardBuilder;
pub use composite::Guard;
pub use registry::GuardRegistry;
