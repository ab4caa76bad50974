//! Syslog line formatting (RFC 3164 style).

use crate::config::EndpointConfig;
use crate::event::LogEvent;

/// Facility used for all shipped lines (local0).
const FACILITY: u16 = 16;

/// Format one event as an RFC 3164-style syslog line:
/// `<PRI>MMM dd HH:MM:SS machine program: message`.
///
/// Pure function of config, user tag, and event.
pub fn format_line(config: &EndpointConfig, user_id: Option<&str>, event: &LogEvent) -> String {
    let pri = FACILITY * 8 + u16::from(event.level.severity());
    let timestamp = event.enqueued_at.format("%b %e %H:%M:%S");
    let program = config.effective_program(user_id);
    format!(
        "<{pri}>{timestamp} {machine} {program}: {message}",
        machine = config.machine_name,
        message = event.message,
    )
}
