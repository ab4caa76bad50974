//! Read-only status projection.

use crate::config::EndpointConfig;
use crate::supervisor::ConnectionState;
use serde::Serialize;

/// Point-in-time, read-only view of the engine.
///
/// Computed on demand, never stored. The only caller-visible signal
/// of delivery trouble (non-zero `pending_logs`, `logger_ready`
/// false).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Whether `init_logger` has ever succeeded.
    pub initialized: bool,
    /// Whether a config has been applied (state is not Uninitialized).
    pub connected: bool,
    /// Whether lines can be transmitted right now.
    pub logger_ready: bool,
    /// Events waiting in the offline queue.
    pub pending_logs: usize,
    /// Configured collector host, empty when unconfigured.
    pub host_name: String,
    /// Configured collector port, 0 when unconfigured.
    pub port: u16,
}

impl StatusSnapshot {
    /// Project a snapshot from component state. Pure; no side effects.
    pub(crate) fn project(
        initialized: bool,
        state: ConnectionState,
        config: Option<&EndpointConfig>,
        sink_connected: bool,
        pending_logs: usize,
    ) -> Self {
        Self {
            initialized,
            connected: state != ConnectionState::Uninitialized,
            logger_ready: state == ConnectionState::Ready && sink_connected,
            pending_logs,
            host_name: config.map(|c| c.host.clone()).unwrap_or_default(),
            port: config.map(|c| c.port).unwrap_or(0),
        }
    }
}
