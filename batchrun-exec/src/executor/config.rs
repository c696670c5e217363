use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::executor::serde_ms;
use crate::retry::RetryConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Items between two inter-batch pauses. Does not control parallelism.
    pub batch_size: usize,
    #[serde(rename = "delay_between_items_ms", with = "serde_ms")]
    pub delay_between_items: Duration,
    #[serde(rename = "delay_between_batches_ms", with = "serde_ms")]
    pub delay_between_batches: Duration,
    pub retry: RetryConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            delay_between_items: Duration::from_millis(500),
            delay_between_batches: Duration::from_millis(2000),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("batch_size must be at least 1")]
    InvalidBatchSize,
    #[error("failed to parse config as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse config as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl FromStr for ExecutorConfig {
    type Err = ConfigError;

    /// Parse a JSON or YAML document. Missing fields take their defaults.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim_start();
        let cfg: Self = if trimmed.starts_with('{') {
            serde_json::from_str(raw)?
        } else if trimmed.is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

impl ExecutorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        Ok(())
    }
}
