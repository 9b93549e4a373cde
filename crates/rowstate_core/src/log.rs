//! Leveled diagnostics.
//!
//! Messages go through `tracing` under the `rowstate` target, but are first
//! gated by the configured [`LogLevel`] so a host can silence rowstate
//! without touching its subscriber.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Log target used for every message.
pub const TARGET: &str = "rowstate";

/// Verbosity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LogLevel {
    /// Nothing is logged.
    Silent = 0,
    /// Failures only.
    Error = 1,
    /// Lifecycle messages and failures.
    Info = 2,
    /// Every state transition.
    Log = 3,
    /// Maximum detail, including realtime payloads.
    Verbose = 100,
}

impl LogLevel {
    /// Returns the numeric threshold.
    pub fn threshold(self) -> u8 {
        self as u8
    }

    /// Returns the level's configuration name.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Silent => "silent",
            LogLevel::Error => "error",
            LogLevel::Info => "info",
            LogLevel::Log => "log",
            LogLevel::Verbose => "verbose",
        }
    }

    /// Parses a level name, treating unrecognized names as [`LogLevel::Silent`].
    pub fn from_name_lossy(name: &str) -> Self {
        name.parse().unwrap_or(LogLevel::Silent)
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Error
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A log level name that is not one of the five known levels.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLogLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "silent" => Ok(LogLevel::Silent),
            "error" => Ok(LogLevel::Error),
            "info" => Ok(LogLevel::Info),
            "log" => Ok(LogLevel::Log),
            "verbose" => Ok(LogLevel::Verbose),
            other => Err(ParseLogLevelError(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(LogLevel::from_name_lossy(&name))
    }
}

/// Emits leveled messages tagged with a scope.
///
/// Output reads `[rowstate] <scope> - <message>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Logger {
    level: LogLevel,
}

impl Logger {
    /// Creates a logger with the given threshold.
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    /// Returns the threshold.
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Returns true if messages at `level` are emitted.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Silent && self.level.threshold() >= level.threshold()
    }

    /// Logs a failure.
    pub fn err(&self, scope: &str, message: impl fmt::Display) {
        if self.enabled(LogLevel::Error) {
            tracing::error!(target: TARGET, scope, "[rowstate] {scope} - {message}");
        }
    }

    /// Logs a lifecycle message.
    pub fn info(&self, scope: &str, message: impl fmt::Display) {
        if self.enabled(LogLevel::Info) {
            tracing::info!(target: TARGET, scope, "[rowstate] {scope} - {message}");
        }
    }

    /// Logs a state transition.
    pub fn log(&self, scope: &str, message: impl fmt::Display) {
        if self.enabled(LogLevel::Log) {
            tracing::debug!(target: TARGET, scope, "[rowstate] {scope} - {message}");
        }
    }

    /// Logs maximum-detail diagnostics.
    pub fn verbose(&self, scope: &str, message: impl fmt::Display) {
        if self.enabled(LogLevel::Verbose) {
            tracing::trace!(target: TARGET, scope, "[rowstate] {scope} - {message}");
        }
    }
}
