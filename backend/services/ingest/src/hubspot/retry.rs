use std::time::Duration;

/// Exponential backoff for provider calls: `base_delay * 2^attempt`, with
/// `attempt` counting retries from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_is_10_20_40_80_seconds() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=policy.max_retries)
            .map(|attempt| policy.backoff(attempt).as_secs())
            .collect();
        assert_eq!(delays, vec![10, 20, 40, 80]);
        assert_eq!(policy.max_attempts(), 5);
    }

    #[test]
    fn zero_base_never_sleeps() {
        let policy = RetryPolicy {
            max_retries: 4,
            base_delay: Duration::ZERO,
        };
        assert_eq!(policy.backoff(4), Duration::ZERO);
    }

    #[test]
    fn huge_attempt_saturates() {
        let policy = RetryPolicy::default();
        assert!(policy.backoff(64) >= policy.backoff(10));
    }
}
