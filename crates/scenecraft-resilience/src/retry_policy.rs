//! Bounded retry with full jitter and kind-based eligibility.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use scenecraft_models::ErrorKind;

#[derive(Debug, Clone)]
pub struct RetryPolicyConfig {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Overrides `ErrorKind::default_max_attempts` per kind; an absent
    /// entry falls back to the default.
    pub max_attempts_overrides: HashMap<ErrorKind, u32>,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            max_attempts_overrides: HashMap::new(),
        }
    }
}

/// Stateless retry decision engine: given an error and how many attempts
/// have already been made, decides whether and when to retry.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryPolicyConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryPolicyConfig) -> Self {
        Self { config }
    }

    fn max_attempts(&self, kind: ErrorKind) -> u32 {
        self.config
            .max_attempts_overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_max_attempts())
    }

    /// Returns the delay before the next attempt, or `None` if the error
    /// is not retryable or attempts are exhausted.
    ///
    /// `server_hint` carries a provider-supplied `retry_after` (used for
    /// `rate_limited`); when present it takes precedence over backoff.
    pub fn next_delay(&self, kind: ErrorKind, retryable: bool, attempts: u32, server_hint: Option<Duration>) -> Option<Duration> {
        if !retryable || matches!(kind, ErrorKind::Cancelled | ErrorKind::Validation) {
            return None;
        }
        if attempts >= self.max_attempts(kind) {
            return None;
        }
        if kind == ErrorKind::RateLimited {
            if let Some(hint) = server_hint {
                return Some(hint);
            }
        }
        Some(self.backoff_with_full_jitter(attempts))
    }

    /// Exponential backoff with full jitter: `uniform(0, min(max, base * 2^attempt))`.
    fn backoff_with_full_jitter(&self, attempt: u32) -> Duration {
        let exp = self.config.base_delay.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
        let capped = exp.min(self.config.max_delay);
        let millis = capped.as_millis().max(1) as u64;
        let jittered = rand::thread_rng().gen_range(0..=millis);
        Duration::from_millis(jittered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_and_cancelled_are_never_retried() {
        let policy = RetryPolicy::new(RetryPolicyConfig::default());
        assert!(policy.next_delay(ErrorKind::Validation, true, 0, None).is_none());
        assert!(policy.next_delay(ErrorKind::Cancelled, true, 0, None).is_none());
    }

    #[test]
    fn non_retryable_flag_overrides_kind_default() {
        let policy = RetryPolicy::new(RetryPolicyConfig::default());
        assert!(policy.next_delay(ErrorKind::Timeout, false, 0, None).is_none());
    }

    #[test]
    fn exhausted_attempts_stop_retrying() {
        let policy = RetryPolicy::new(RetryPolicyConfig::default());
        // default max_attempts(timeout) = 3
        assert!(policy.next_delay(ErrorKind::Timeout, true, 3, None).is_none());
        assert!(policy.next_delay(ErrorKind::Timeout, true, 2, None).is_some());
    }

    #[test]
    fn rate_limited_prefers_server_hint() {
        let policy = RetryPolicy::new(RetryPolicyConfig::default());
        let delay = policy
            .next_delay(ErrorKind::RateLimited, true, 0, Some(Duration::from_secs(7)))
            .unwrap();
        assert_eq!(delay, Duration::from_secs(7));
    }

    #[test]
    fn backoff_is_bounded_by_max_delay() {
        let config = RetryPolicyConfig {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            max_attempts_overrides: HashMap::new(),
        };
        let policy = RetryPolicy::new(config);
        for attempt in 0..10 {
            if let Some(delay) = policy.next_delay(ErrorKind::DependencyUnavailable, true, attempt, None) {
                assert!(delay <= Duration::from_secs(5));
            }
        }
    }
}
