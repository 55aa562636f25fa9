//! Engine configuration.
//!
//! Every section has defaults, so a TOML document only needs the keys it
//! changes. Durations are expressed in milliseconds.

use crate::error::{ConfigError, RetryConfigError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for all engine components.
///
/// # Examples
///
/// ```
/// use skillflow::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::from_toml_str(r#"
///     [executor]
///     default_timeout_ms = 5000
///
///     [cache]
///     max_size = 64
/// "#).unwrap();
///
/// assert_eq!(config.executor.default_timeout(), Duration::from_secs(5));
/// assert_eq!(config.cache.max_size, 64);
/// assert!(config.workflow.auto_save);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub executor: ExecutorConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub workflow: WorkflowConfig,
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(s)?;
        config.retry.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

/// Settings for [`crate::SkillExecutor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Timeout applied when neither the call nor the task sets one.
    pub default_timeout_ms: u64,
    /// Execution-level retries applied when neither the call nor the task sets one.
    pub default_max_retries: u32,
    /// Pause between attempts.
    pub retry_delay_ms: u64,
    /// Buffer size of the event channel.
    pub event_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            default_max_retries: 0,
            retry_delay_ms: 100,
            event_capacity: 256,
        }
    }
}

impl ExecutorConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Settings for [`crate::RetryStrategy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Factor applied per attempt (1-10).
    pub multiplier: f64,
    /// Scale each delay by a random factor in `[0.5, 1.0]`.
    pub jitter: bool,
    /// Upper bound for the whole retry loop.
    pub overall_timeout_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 10_000,
            multiplier: 2.0,
            jitter: false,
            overall_timeout_ms: None,
        }
    }
}

impl RetryConfig {
    /// Exponential backoff with `multiplier = 2` and a 60s cap.
    pub fn exponential(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay_ms: initial_delay.as_millis() as u64,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            jitter: false,
            overall_timeout_ms: None,
        }
    }

    /// Constant delay between attempts.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self {
            max_retries,
            initial_delay_ms: ms,
            max_delay_ms: ms,
            multiplier: 1.0,
            jitter: false,
            overall_timeout_ms: None,
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn overall_timeout(&self) -> Option<Duration> {
        self.overall_timeout_ms.map(Duration::from_millis)
    }

    /// Checks the backoff parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RetryConfigError`] if:
    /// - `multiplier` is below 1 (delays would shrink)
    /// - `multiplier` is greater than 10 (risk of overflow)
    /// - `max_delay_ms` is less than `initial_delay_ms`
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        if self.multiplier.is_nan() || self.multiplier < 1.0 {
            return Err(RetryConfigError("multiplier must be at least 1"));
        }
        if self.multiplier > 10.0 {
            return Err(RetryConfigError(
                "multiplier must be 10 or less to avoid overflow",
            ));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(RetryConfigError("max_delay must be >= initial_delay"));
        }
        Ok(())
    }
}

/// Settings for [`crate::Cache`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries; `0` means unbounded.
    pub max_size: usize,
    /// TTL applied when `set` is called without one; `None` or `0` never expires.
    pub default_ttl_ms: Option<u64>,
    /// Evict by access count when full; otherwise evict the oldest insert.
    pub lru: bool,
    /// Period of the background expiry sweep.
    pub sweep_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            default_ttl_ms: None,
            lru: true,
            sweep_interval_ms: 60_000,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_ms.map(Duration::from_millis)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// Settings for [`crate::WorkflowExecutor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Persist the execution record after every step.
    pub auto_save: bool,
    /// Upper bound on steps executed in one drive of the loop.
    pub max_steps: u32,
    /// Output keys of successful steps published into the read-only context.
    pub read_only_keys: Vec<String>,
    /// Reject workflows that name unregistered skills before running them.
    pub validate_skills: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            auto_save: true,
            max_steps: 1000,
            read_only_keys: [
                "requirements",
                "analysis",
                "collected_data",
                "generated_code",
                "test_report",
                "report",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            validate_skills: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.executor.default_timeout(), Duration::from_secs(30));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.cache.max_size, 1000);
        assert!(config.cache.lru);
        assert!(config.workflow.auto_save);
        assert!(config
            .workflow
            .read_only_keys
            .contains(&"test_report".to_string()));
    }

    #[test]
    fn test_retry_validation() {
        assert!(RetryConfig::default().validate().is_ok());
        assert!(RetryConfig::fixed(3, Duration::from_secs(1)).validate().is_ok());

        let config = RetryConfig {
            multiplier: 11.0,
            ..RetryConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err().0,
            "multiplier must be 10 or less to avoid overflow"
        );

        let config = RetryConfig {
            initial_delay_ms: 500,
            max_delay_ms: 100,
            ..RetryConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err().0,
            "max_delay must be >= initial_delay"
        );

        let config = RetryConfig {
            multiplier: f64::NAN,
            ..RetryConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_retry_section_rejected() {
        let result = EngineConfig::from_toml_str("[retry]\nmultiplier = 0.0\n");
        assert!(matches!(result, Err(ConfigError::Retry(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = EngineConfig::from_toml_str("[cache]\nmax_size = \"many\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = EngineConfig::from_path("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
