// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry policy for failed jobs.

use std::time::Duration;

/// Bounded exponential backoff applied to retriable job failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed before a job is dead-lettered.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Multiplier applied per additional attempt.
    pub factor: u32,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(30),
            factor: 2,
            max_delay: Duration::from_secs(1200),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next run after `attempt` failed attempts (1-based).
    ///
    /// Computes `base * factor^(attempt - 1)` capped at `max_delay`.
    /// Non-decreasing in `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let cap = self.max_delay.max(self.base_delay);
        if self.factor <= 1 {
            return self.base_delay.min(cap);
        }
        let mut delay = self.base_delay;
        for _ in 1..attempt.max(1) {
            if delay >= cap {
                break;
            }
            delay = delay.saturating_mul(self.factor);
        }
        delay.min(cap)
    }

    /// Whether a retriable failure on the given attempt count still leaves
    /// room for another attempt. `attempts` is the count after incrementing.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_schedule_doubles_until_cap() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=8).map(|a| policy.delay_for(a).as_secs()).collect();
        assert_eq!(delays, vec![30, 60, 120, 240, 480, 960, 1200, 1200]);
    }

    #[test]
    fn attempt_zero_is_treated_as_first() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), policy.delay_for(1));
    }

    #[test]
    fn factor_one_is_constant() {
        let policy = RetryPolicy {
            factor: 1,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(30));
        assert_eq!(policy.delay_for(10), Duration::from_secs(30));
    }

    #[test]
    fn retry_allowed_below_max() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
    }

    proptest! {
        #[test]
        fn backoff_is_monotonic_and_bounded(
            base in 0u64..10_000,
            factor in 0u32..10,
            cap in 0u64..100_000,
            attempt in 1u32..200,
        ) {
            let policy = RetryPolicy {
                max_attempts: 5,
                base_delay: Duration::from_millis(base),
                factor,
                max_delay: Duration::from_millis(cap),
            };
            let now = policy.delay_for(attempt);
            let next = policy.delay_for(attempt + 1);
            prop_assert!(next >= now);
            prop_assert!(now <= policy.max_delay.max(policy.base_delay));
        }
    }
}
