//! Configuration for container construction.

use crate::log::LogLevel;
use serde::{Deserialize, Serialize};

/// How a container treats overlapping operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Consistency {
    /// Every operation writes its outcome; the container shows whichever
    /// write landed last.
    #[default]
    LastWriteWins,
    /// Only the most recently started operation writes its outcome. Older
    /// operations still return their own results to their callers.
    LatestOperation,
}

/// Configuration shared by every container a factory builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Log threshold.
    pub log: LogLevel,
    /// Overlapping-operation policy.
    pub consistency: Consistency,
}

impl StoreConfig {
    /// Creates the default configuration: `error` logging, last write wins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log threshold.
    pub fn with_log(mut self, log: LogLevel) -> Self {
        self.log = log;
        self
    }

    /// Sets the overlapping-operation policy.
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.log, LogLevel::Error);
        assert_eq!(config.consistency, Consistency::LastWriteWins);
    }

    #[test]
    fn config_builder() {
        let config = StoreConfig::new()
            .with_log(LogLevel::Verbose)
            .with_consistency(Consistency::LatestOperation);
        assert_eq!(config.log, LogLevel::Verbose);
        assert_eq!(config.consistency, Consistency::LatestOperation);
    }

    #[test]
    fn deserialize_partial() {
        let config: StoreConfig = serde_json::from_str(r#"{ "log": "info" }"#).unwrap();
        assert_eq!(config.log, LogLevel::Info);
        assert_eq!(config.consistency, Consistency::LastWriteWins);

        let config: StoreConfig =
            serde_json::from_str(r#"{ "log": "nope", "consistency": "latest-operation" }"#)
                .unwrap();
        assert_eq!(config.log, LogLevel::Silent);
        assert_eq!(config.consistency, Consistency::LatestOperation);
    }
}
