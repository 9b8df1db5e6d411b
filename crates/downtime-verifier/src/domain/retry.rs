//! Polling/retry policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Interval between attempts plus an optional attempt bound.
///
/// `max_attempts == None` polls until the condition holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub interval_ms: u64,
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Poll forever at `interval`.
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            max_attempts: None,
        }
    }

    /// At most `max_attempts` attempts, `interval` apart.
    pub fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            max_attempts: Some(max_attempts),
        }
    }

    /// Zero-latency policy for tests.
    pub fn immediate(max_attempts: Option<u32>) -> Self {
        Self {
            interval_ms: 0,
            max_attempts,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Whether attempt number `attempt` (1-based) may run.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }

    /// Sleep for the policy interval.
    pub async fn pause(&self) {
        if self.interval_ms > 0 {
            tokio::time::sleep(self.interval()).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_allows() {
        let policy = RetryPolicy::bounded(Duration::from_secs(1), 3);
        assert!(policy.allows(1));
        assert!(policy.allows(3));
        assert!(!policy.allows(4));
        assert_eq!(policy.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_unbounded_allows_everything() {
        let policy = RetryPolicy::unbounded(Duration::from_millis(250));
        assert!(policy.allows(u32::MAX));
        assert_eq!(policy.interval_ms, 250);
    }

    #[tokio::test]
    async fn test_immediate_pause_returns() {
        RetryPolicy::immediate(Some(1)).pause().await;
    }
}
