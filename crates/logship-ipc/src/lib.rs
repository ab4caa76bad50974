//! IPC layer for the log delivery daemon.
//!
//! This crate provides:
//! - Unix domain socket server with NDJSON framing
//! - JSON-RPC-like protocol for the logger surface
//! - Request dispatch against a [`logship_engine::DeliveryEngine`]

mod dispatch;
mod error;
mod protocol;
mod server;

pub use dispatch::Dispatcher;
pub use error::{IpcError, IpcResult};
pub use protocol::{
    error_codes, ErrorInfo, InitLoggerParams, LogParams, Method, Request, Response,
    SetUserIdParams,
};
pub use server::{IpcClient, IpcServer};
