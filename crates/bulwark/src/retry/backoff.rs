// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cmp::min;
use std::time::Duration;

use super::RetryPolicy;
use crate::rnd::Rnd;
use crate::utils::secs_to_duration_saturating;

/// Infinite sequence of jittered retry delays for a [`RetryPolicy`].
#[derive(Debug)]
pub(crate) struct DelaysIter {
    policy: RetryPolicy,
    retry_index: u32,
    rnd: Rnd,
}

impl DelaysIter {
    pub fn new(policy: RetryPolicy, rnd: Rnd) -> Self {
        Self {
            policy,
            retry_index: 0,
            rnd,
        }
    }
}

impl Iterator for DelaysIter {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        let delay = self.policy.backoff(self.retry_index);
        self.retry_index = self.retry_index.saturating_add(1);

        Some(apply_jitter(
            delay,
            self.policy.get_jitter_fraction(),
            self.policy.get_max_backoff(),
            &self.rnd,
        ))
    }
}

/// `min(max, initial * multiplier^n)`, saturating on overflow.
pub(super) fn exponential(initial: Duration, multiplier: f64, retry_index: u32, max: Duration) -> Duration {
    if initial.is_zero() {
        return Duration::ZERO;
    }

    let factor = multiplier.powi(i32::try_from(retry_index).unwrap_or(i32::MAX));
    min(secs_to_duration_saturating(initial.as_secs_f64() * factor), max)
}

/// Samples uniformly from `[delay * (1 - fraction), delay * (1 + fraction)]`, clamped to `[0, max]`.
fn apply_jitter(delay: Duration, fraction: f64, max: Duration, rnd: &Rnd) -> Duration {
    if fraction <= 0.0 || delay.is_zero() {
        return delay;
    }

    let secs = delay.as_secs_f64();
    let low = secs * (1.0 - fraction);
    let spread = secs * 2.0 * fraction;

    min(secs_to_duration_saturating(spread.mul_add(rnd.next_f64(), low)), max)
}
