use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::executor::serde_ms;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries allowed per item after the first attempt.
    pub max_retries: u32,
    /// Wait used when a rate-limit error carries no `retry in N seconds` hint.
    #[serde(rename = "default_delay_ms", with = "serde_ms")]
    pub default_delay: Duration,
    /// Upper bound applied to any backoff. `None` waits as long as the error asks.
    #[serde(rename = "max_delay_ms", with = "serde_ms::option")]
    pub max_delay: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            default_delay: Duration::from_millis(60_000),
            max_delay: None,
        }
    }
}
