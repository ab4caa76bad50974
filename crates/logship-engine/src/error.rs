//! Delivery engine error types.

use thiserror::Error;

/// Delivery engine error type.
///
/// Only validation errors are surfaced to callers. Sink connect/send
/// failures are absorbed by the engine (enqueue + retry) and never
/// appear here; sink implementations speak `std::io::Result` instead.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or missing init parameters
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Malformed log or user-id parameters
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation requires a prior successful init
    #[error("Logger is not initialized")]
    NotInitialized,
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
