//! Loader configuration, loadable from JSON.

use crate::element::LESS_CONTAINER_ID;
use crate::retry::{Attempts, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid config {0}: {1}")]
    Parse(PathBuf, #[source] serde_json::Error),
}

/// Failure-detection poll applied to every script load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Number of checks; `-1` polls until the budget or cancellation, any other
    /// negative value allows none.
    pub times: Attempts,
    pub delay_ms: u64,
    pub delay_more_ms: u64,
    pub budget_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::script_default();
        Self {
            times: policy.times,
            delay_ms: policy.delay.as_millis() as u64,
            delay_more_ms: policy.delay_more.as_millis() as u64,
            budget_ms: None,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            times: self.times,
            delay: Duration::from_millis(self.delay_ms),
            delay_more: Duration::from_millis(self.delay_more_ms),
            budget: self.budget_ms.map(Duration::from_millis),
        }
    }
}

/// Everything about a loader that is not a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub script_retry: RetryConfig,
    /// Id of the single `<style>` element compiled LESS is appended to.
    pub less_container_id: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            script_retry: RetryConfig::default(),
            less_container_id: LESS_CONTAINER_ID.to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_script_poll() {
        let config = LoaderConfig::default();
        assert_eq!(config.script_retry.policy(), RetryPolicy::script_default());
        assert_eq!(config.less_container_id, "lazyload-style");
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "script_retry": {{ "times": -1, "delay_ms": 250, "budget_ms": 30000 }} }}"#
        )
        .unwrap();

        let config = LoaderConfig::from_file(file.path()).unwrap();
        let policy = config.script_retry.policy();
        assert_eq!(policy.times, Attempts::Unlimited);
        assert_eq!(policy.delay, Duration::from_millis(250));
        assert_eq!(policy.delay_more, Duration::ZERO);
        assert_eq!(policy.budget, Some(Duration::from_secs(30)));
        assert_eq!(config.less_container_id, "lazyload-style");
    }

    #[test]
    fn test_negative_times_other_than_unlimited() {
        let config: LoaderConfig =
            serde_json::from_str(r#"{ "script_retry": { "times": -5 } }"#).unwrap();
        assert_eq!(config.script_retry.times, Attempts::Limited(0));
    }

    #[test]
    fn test_missing_and_invalid_files() {
        let err = LoaderConfig::from_file(Path::new("/nonexistent/lazyload.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = LoaderConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(..)));
    }
}
