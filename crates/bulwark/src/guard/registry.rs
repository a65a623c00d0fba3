// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Mutex;

use super::Guard;
use crate::GuardContext;
use crate::config::GuardConfig;

const ERR_POISONED_LOCK: &str = "poisoned lock - cannot continue execution because the guard registry can no longer be trusted";

/// Hands out one [`Guard`] per dependency name.
///
/// Guards are created on first use from the registry's default [`GuardConfig`], or from a
/// per-name override. Asking for the same name again returns a clone of the same guard, so all
/// callers of a dependency share its breaker and bulkhead while different dependencies stay
/// isolated from each other.
///
/// # Examples
///
/// ```rust
/// use bulwark::config::GuardConfig;
/// use bulwark::{GuardContext, GuardRegistry};
/// use tick::Clock;
///
/// # fn example(clock: Clock) {
/// let mut search = GuardConfig::default();
/// search.bulkhead.capacity = 4;
///
/// let registry = GuardRegistry::new(&GuardContext::new(&clock)).with_override("search", search);
///
/// assert_eq!(registry.get("search").bulkhead().capacity(), 4);
/// assert_eq!(registry.get("billing").bulkhead().capacity(), 64);
/// # }
/// ```
#[derive(Debug)]
pub struct GuardRegistry {
    context: GuardContext,
    default_config: GuardConfig,
    overrides: HashMap<String, GuardConfig>,
    guards: Mutex<HashMap<String, Guard>>,
}

impl GuardRegistry {
    /// Creates an empty registry using [`GuardConfig::default`] for every dependency.
    #[must_use]
    pub fn new(context: &GuardContext) -> Self {
        Self {
            context: context.clone(),
            default_config: GuardConfig::default(),
            overrides: HashMap::new(),
            guards: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the configuration used for dependencies without an override.
    #[must_use]
    pub fn with_default(mut self, config: GuardConfig) -> Self {
        self.default_config = config;
        self
    }

    /// Sets the configuration used for the dependency called `name`.
    #[must_use]
    pub fn with_override(mut self, name: impl Into<String>, config: GuardConfig) -> Self {
        self.overrides.insert(name.into(), config);
        self
    }

    /// Returns the guard for `name`, creating it on first use.
    #[must_use]
    pub fn get(&self, name: &str) -> Guard {
        let mut guards = self.guards.lock().expect(ERR_POISONED_LOCK);

        if let Some(guard) = guards.get(name) {
            return guard.clone();
        }

        let config = self.overrides.get(name).unwrap_or(&self.default_config);
        let guard = Guard::from_config(name.to_owned(), config, &self.context);
        guards.insert(name.to_owned(), guard.clone());

        guard
    }

    /// Names of the guards created so far, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.guards.lock().expect(ERR_POISONED_LOCK).keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
