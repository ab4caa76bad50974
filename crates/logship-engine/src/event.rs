//! Log events and levels.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Log severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
    Verbose,
}

impl LogLevel {
    /// Syslog severity value for this level (RFC 3164 numerical codes).
    ///
    /// Verbose has no syslog equivalent and maps to debug.
    pub fn severity(&self) -> u8 {
        match self {
            LogLevel::Error => 3,
            LogLevel::Warning => 4,
            LogLevel::Info => 6,
            LogLevel::Debug | LogLevel::Verbose => 7,
        }
    }

    /// Lowercase wire name, as accepted by the caller-facing surface.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "verbose",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(LogLevel::Error),
            "warning" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "verbose" => Ok(LogLevel::Verbose),
            other => Err(EngineError::InvalidArgument(format!(
                "unknown log level: {other:?}"
            ))),
        }
    }
}

/// A single application log event awaiting delivery.
///
/// Immutable once created; consumed exactly once under normal
/// operation, or dropped only by an explicit queue clear.
#[derive(Debug, Clone)]
pub struct LogEvent {
    /// The log message (non-empty).
    pub message: String,
    /// Severity level.
    pub level: LogLevel,
    /// When the event entered the engine.
    pub enqueued_at: DateTime<Utc>,
}

impl LogEvent {
    /// Create a new event stamped with the current time.
    pub fn new(message: impl Into<String>, level: LogLevel) -> Self {
        Self {
            message: message.into(),
            level,
            enqueued_at: Utc::now(),
        }
    }
}
