//! Logship engine: resilient delivery of application log events to a
//! syslog-style collector.
//!
//! The engine accepts log events and an endpoint configuration, and
//! guarantees every accepted event is eventually delivered, surviving
//! network loss, endpoint unavailability, and connection churn,
//! without blocking the caller.
//!
//! # Core Invariants
//!
//! 1. **Never lose silently**: queued events leave the queue only by
//!    successful transmission or an explicit clear
//! 2. **Never block the caller**: backoff and connect waits happen on
//!    the supervisor task, not in `log`
//! 3. **FIFO per queue**: queued events are delivered in enqueue order
//! 4. **No terminal failure**: exhausted retries park in backoff and
//!    re-arm on a reachability edge or force-reconnect
//!
//! # Architecture
//!
//! ```text
//! caller -> DeliveryEngine -> [ready? LogSink.send]
//!                          -> [else  OfflineQueue + reconnect]
//!
//! ReachabilityMonitor ─┐
//! retry timer ─────────┼─> ConnectionSupervisor ─ready edge─> drain
//! force_reconnect ─────┘
//! ```

mod config;
mod engine;
mod error;
mod event;
mod queue;
mod reachability;
mod sink;
mod status;
mod supervisor;
mod syslog;

#[cfg(test)]
mod tests;

pub use config::{EndpointConfig, PortInput, RetryPolicy};
pub use engine::DeliveryEngine;
pub use error::{EngineError, EngineResult};
pub use event::{LogEvent, LogLevel};
pub use queue::OfflineQueue;
pub use reachability::{ManualReachability, ReachabilityMonitor, StaticReachability};
pub use sink::{LogSink, TcpLogSink};
pub use status::StatusSnapshot;
pub use supervisor::{ConnectionState, ConnectionSupervisor};
pub use syslog::format_line;
