//! Gateway configuration.

use std::time::Duration;

use greens_commerce::Currency;
use serde::{Deserialize, Serialize};

use crate::retry::{BackoffStrategy, RetryCondition, RetryPolicy};

/// How to reach the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// API root, e.g. `https://api.globalgreens.example/api`.
    pub base_url: String,
    /// Currency of every price the backend sends.
    pub currency: Currency,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    /// Retries for idempotent requests.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Statuses retried on top of 5xx, timeouts and refused connections.
    pub retry_statuses: Vec<u16>,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        if self.max_retries == 0 {
            return RetryPolicy::none();
        }
        let policy = RetryPolicy::new(self.max_retries);
        let mut conditions = policy.retry_on.clone();
        conditions.extend(self.retry_statuses.iter().map(|s| RetryCondition::StatusCode(*s)));
        policy
            .with_conditions(conditions)
            .with_backoff(BackoffStrategy::Exponential {
                base: Duration::from_millis(self.backoff_base_ms),
                max: Duration::from_millis(self.backoff_max_ms),
            })
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            currency: Currency::default(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 15_000,
            max_retries: 2,
            backoff_base_ms: 100,
            backoff_max_ms: 2_000,
            retry_statuses: vec![429],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"base_url":"https://api.test","max_retries":0}"#).unwrap();
        assert_eq!(config.base_url, "https://api.test");
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.retry_policy(), RetryPolicy::none());
    }

    #[test]
    fn test_retry_statuses_extend_policy() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"max_retries":1,"retry_statuses":[408]}"#).unwrap();
        let policy = config.retry_policy();
        assert!(policy.retry_on.contains(&RetryCondition::ServerError));
        assert!(policy.retry_on.contains(&RetryCondition::StatusCode(408)));
        assert!(!policy.retry_on.contains(&RetryCondition::StatusCode(429)));

        let defaults = GatewayConfig::default().retry_policy();
        assert!(defaults.retry_on.contains(&RetryCondition::StatusCode(429)));
    }
}
