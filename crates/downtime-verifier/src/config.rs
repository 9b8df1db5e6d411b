//! Configuration types for downtime verification

use crate::domain::{BlockHeight, RetryPolicy, ValidatorId};
use crate::error::VerificationError;
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Upper bound for the start offset and the duration of a requested window.
const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

/// Runtime configuration for a verification run
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Chain height to wait for before starting, so span data exists
    pub min_start_block: BlockHeight,

    /// Seconds from now until the requested downtime starts
    pub downtime_start_offset_secs: u64,

    /// Requested downtime length in seconds
    pub downtime_duration_secs: u64,

    /// Validator the downtime is requested for
    pub target_validator_id: ValidatorId,

    /// Polling for `wait until height >= target` (unbounded by default)
    pub height_poll: RetryPolicy,

    /// Registry refreshes while looking for the span covering the estimate
    pub span_retry: RetryPolicy,

    /// Authoritative downtime lookups after submission
    pub reconcile_retry: RetryPolicy,

    /// Per-request HTTP timeout for registry and RPC calls
    pub http_timeout_secs: u64,

    /// Heimdall home directory on the validator hosts
    pub heimdall_home: String,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            min_start_block: crate::DEFAULT_MIN_START_BLOCK,
            downtime_start_offset_secs: 180,
            downtime_duration_secs: 180,
            target_validator_id: 1,
            height_poll: RetryPolicy::unbounded(Duration::from_secs(1)),
            span_retry: RetryPolicy::bounded(Duration::from_secs(10), 256),
            reconcile_retry: RetryPolicy::bounded(Duration::from_secs(1), 5),
            http_timeout_secs: 10,
            heimdall_home: "/etc/heimdall".to_string(),
        }
    }
}

impl VerifierConfig {
    /// Create configuration from environment variables, falling back to defaults.
    ///
    /// # Environment Variables
    ///
    /// - `PDV_MIN_START_BLOCK` (default: 128)
    /// - `PDV_DOWNTIME_START_OFFSET_SECS` (default: 180)
    /// - `PDV_DOWNTIME_DURATION_SECS` (default: 180)
    /// - `PDV_TARGET_VALIDATOR_ID` (default: 1)
    /// - `PDV_HEIGHT_POLL_MS` (default: 1000)
    /// - `PDV_SPAN_RETRY_MS` / `PDV_SPAN_RETRY_ATTEMPTS` (default: 10000 / 256)
    /// - `PDV_RECONCILE_RETRY_MS` / `PDV_RECONCILE_RETRY_ATTEMPTS` (default: 1000 / 5)
    /// - `PDV_HTTP_TIMEOUT_SECS` (default: 10)
    /// - `PDV_HEIMDALL_HOME` (default: /etc/heimdall)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            min_start_block: env_parse("PDV_MIN_START_BLOCK").unwrap_or(defaults.min_start_block),
            downtime_start_offset_secs: env_parse("PDV_DOWNTIME_START_OFFSET_SECS")
                .unwrap_or(defaults.downtime_start_offset_secs),
            downtime_duration_secs: env_parse("PDV_DOWNTIME_DURATION_SECS")
                .unwrap_or(defaults.downtime_duration_secs),
            target_validator_id: env_parse("PDV_TARGET_VALIDATOR_ID")
                .unwrap_or(defaults.target_validator_id),
            height_poll: RetryPolicy {
                interval_ms: env_parse("PDV_HEIGHT_POLL_MS")
                    .unwrap_or(defaults.height_poll.interval_ms),
                max_attempts: defaults.height_poll.max_attempts,
            },
            span_retry: RetryPolicy {
                interval_ms: env_parse("PDV_SPAN_RETRY_MS")
                    .unwrap_or(defaults.span_retry.interval_ms),
                max_attempts: env_parse("PDV_SPAN_RETRY_ATTEMPTS")
                    .or(defaults.span_retry.max_attempts),
            },
            reconcile_retry: RetryPolicy {
                interval_ms: env_parse("PDV_RECONCILE_RETRY_MS")
                    .unwrap_or(defaults.reconcile_retry.interval_ms),
                max_attempts: env_parse("PDV_RECONCILE_RETRY_ATTEMPTS")
                    .or(defaults.reconcile_retry.max_attempts),
            },
            http_timeout_secs: env_parse("PDV_HTTP_TIMEOUT_SECS")
                .unwrap_or(defaults.http_timeout_secs),
            heimdall_home: env::var("PDV_HEIMDALL_HOME").unwrap_or(defaults.heimdall_home),
        }
    }

    /// Reject values that would make the run meaningless.
    pub fn validate(&self) -> Result<(), VerificationError> {
        if self.downtime_duration_secs == 0 {
            return Err(VerificationError::Config(
                "downtime duration must be at least one second".to_string(),
            ));
        }
        for (name, secs) in [
            ("downtime start offset", self.downtime_start_offset_secs),
            ("downtime duration", self.downtime_duration_secs),
        ] {
            if secs > MAX_WINDOW_SECS {
                return Err(VerificationError::Config(format!(
                    "{} of {}s exceeds {}s",
                    name, secs, MAX_WINDOW_SECS
                )));
            }
        }
        if self.http_timeout_secs == 0 {
            return Err(VerificationError::Config(
                "HTTP timeout must be at least one second".to_string(),
            ));
        }
        for (name, policy) in [
            ("span_retry", &self.span_retry),
            ("reconcile_retry", &self.reconcile_retry),
        ] {
            if policy.max_attempts == Some(0) {
                return Err(VerificationError::Config(format!(
                    "{} allows zero attempts",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn downtime_start_offset(&self) -> Duration {
        Duration::from_secs(self.downtime_start_offset_secs)
    }

    pub fn downtime_duration(&self) -> Duration {
        Duration::from_secs(self.downtime_duration_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VerifierConfig::default();
        assert_eq!(config.min_start_block, 128);
        assert_eq!(config.downtime_start_offset(), Duration::from_secs(180));
        assert_eq!(config.downtime_duration(), Duration::from_secs(180));
        assert_eq!(config.target_validator_id, 1);
        assert_eq!(config.height_poll.max_attempts, None);
        assert_eq!(config.span_retry.max_attempts, Some(256));
        assert_eq!(config.reconcile_retry.max_attempts, Some(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_duration() {
        let config = VerifierConfig {
            downtime_duration_secs: 0,
            ..VerifierConfig::default()
        };
        assert!(matches!(config.validate(), Err(VerificationError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_window() {
        let config = VerifierConfig {
            downtime_start_offset_secs: u64::MAX,
            ..VerifierConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("downtime start offset"));

        let config = VerifierConfig {
            downtime_duration_secs: MAX_WINDOW_SECS + 1,
            ..VerifierConfig::default()
        };
        assert!(matches!(config.validate(), Err(VerificationError::Config(_))));

        let config = VerifierConfig {
            downtime_duration_secs: MAX_WINDOW_SECS,
            ..VerifierConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = VerifierConfig {
            reconcile_retry: RetryPolicy::immediate(Some(0)),
            ..VerifierConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reconcile_retry"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: VerifierConfig = serde_json::from_str(
            r#"{"target_validator_id": 3, "span_retry": {"interval_ms": 0, "max_attempts": 4}}"#,
        )
        .unwrap();
        assert_eq!(config.target_validator_id, 3);
        assert_eq!(config.span_retry, RetryPolicy::immediate(Some(4)));
        assert_eq!(config.min_start_block, 128);
    }
}
