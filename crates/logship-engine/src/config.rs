//! Endpoint configuration and retry policy.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remote collector endpoint configuration.
///
/// Immutable once applied; replacing it tears down and rebuilds the
/// sink connection. The optional user-id decoration lives on the
/// engine, not here, so it can change without touching the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Collector host name or address.
    pub host: String,
    /// Collector port (1-65535).
    pub port: u16,
    /// Program name used to tag shipped lines.
    pub program_name: String,
    /// Machine name used to tag shipped lines.
    pub machine_name: String,
}

impl EndpointConfig {
    /// Build a validated config.
    ///
    /// All strings must be non-empty after trimming; the port must
    /// normalize to 1-65535 from either a number or a numeric string.
    pub fn new(
        host: &str,
        port: impl Into<PortInput>,
        program_name: &str,
        machine_name: &str,
    ) -> EngineResult<Self> {
        let host = non_empty("hostName", host)?;
        let program_name = non_empty("programName", program_name)?;
        let machine_name = non_empty("machineName", machine_name)?;
        let port = port.into().normalize()?;

        Ok(Self {
            host,
            port,
            program_name,
            machine_name,
        })
    }

    /// Effective program name with the optional user tag applied.
    pub fn effective_program(&self, user_id: Option<&str>) -> String {
        match user_id {
            Some(user_id) => format!("{user_id}-{}", self.program_name),
            None => self.program_name.clone(),
        }
    }
}

fn non_empty(field: &str, value: &str) -> EngineResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidConfig(format!(
            "{field} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Port as accepted on the wire: a number or a numeric string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortInput {
    Number(i64),
    Text(String),
}

impl PortInput {
    /// Normalize to a valid port (1-65535).
    pub fn normalize(&self) -> EngineResult<u16> {
        let raw = match self {
            PortInput::Number(n) => *n,
            PortInput::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                EngineError::InvalidConfig(format!("port is not numeric: {s:?}"))
            })?,
        };
        if (1..=65535).contains(&raw) {
            Ok(raw as u16)
        } else {
            Err(EngineError::InvalidConfig(format!(
                "port out of range: {raw}"
            )))
        }
    }
}

impl From<u16> for PortInput {
    fn from(port: u16) -> Self {
        PortInput::Number(i64::from(port))
    }
}

impl From<i64> for PortInput {
    fn from(port: i64) -> Self {
        PortInput::Number(port)
    }
}

impl From<&str> for PortInput {
    fn from(port: &str) -> Self {
        PortInput::Text(port.to_string())
    }
}

/// Reconnect retry policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Connect attempts per backoff round before parking until an
    /// external trigger (reachability edge or force-reconnect).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap for exponential delay growth.
    pub max_delay: Duration,
    /// Settle delay after a reachable edge, to avoid thrashing while
    /// the network interface comes up.
    pub settle_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            settle_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), capped exponential.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exp);
        delay.min(self.max_delay)
    }
}
