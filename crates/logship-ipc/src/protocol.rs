//! IPC protocol definitions.
//!
//! Uses a JSON-RPC-like protocol over Unix domain sockets. Parameter
//! objects use camelCase keys on the wire.

use logship_engine::{LogLevel, PortInput};
use serde::{Deserialize, Serialize};

/// IPC method types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    // Daemon
    Health,
    Shutdown,

    // Logger
    #[serde(rename = "logger.init")]
    LoggerInit,
    #[serde(rename = "logger.set_user_id")]
    LoggerSetUserId,
    #[serde(rename = "logger.log")]
    LoggerLog,
    #[serde(rename = "logger.status")]
    LoggerStatus,
    #[serde(rename = "logger.flush")]
    LoggerFlush,
    #[serde(rename = "logger.force_reconnect")]
    LoggerForceReconnect,
    #[serde(rename = "logger.clear_pending")]
    LoggerClearPending,
}

/// Parameters for `logger.init`.
///
/// The port crosses the wire as a number or a numeric string; the
/// engine validates the 1-65535 range either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitLoggerParams {
    pub host_name: String,
    pub port: PortInput,
    pub program_name: String,
    pub machine_name: String,
}

/// Parameters for `logger.set_user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUserIdParams {
    pub user_id: String,
}

/// Parameters for `logger.log`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogParams {
    pub message: String,
    /// Defaults to `info` when omitted.
    #[serde(default)]
    pub level: Option<LogLevel>,
}

/// IPC request message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation.
    pub id: String,
    /// Method to invoke.
    pub method: Method,
    /// Method parameters (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    /// Create a new request with auto-generated ID.
    pub fn new(method: Method) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            method,
            params: None,
        }
    }

    /// Create a new request with parameters.
    pub fn with_params(method: Method, params: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            method,
            params: Some(params),
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// IPC response message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Request ID for correlation.
    pub id: String,
    /// Result data (if successful).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error information (if failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// Error information in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code.
    pub code: i32,
    /// Error message.
    pub message: String,
}

impl Response {
    /// Create a successful response.
    pub fn success(id: &str, result: serde_json::Value) -> Self {
        Self {
            id: id.to_string(),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: &str, code: i32, message: &str) -> Self {
        Self {
            id: id.to_string(),
            result: None,
            error: Some(ErrorInfo {
                code,
                message: message.to_string(),
            }),
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if the response is successful.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

// Standard error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const NOT_INITIALIZED: i32 = -32001;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = Request::new(Method::Health);
        let json = request.to_json().unwrap();

        assert!(json.contains("\"method\":\"health\""));
        assert!(json.contains("\"id\":"));
    }

    #[test]
    fn test_all_methods_serialize() {
        let methods = vec![
            (Method::Health, "health"),
            (Method::Shutdown, "shutdown"),
            (Method::LoggerInit, "logger.init"),
            (Method::LoggerSetUserId, "logger.set_user_id"),
            (Method::LoggerLog, "logger.log"),
            (Method::LoggerStatus, "logger.status"),
            (Method::LoggerFlush, "logger.flush"),
            (Method::LoggerForceReconnect, "logger.force_reconnect"),
            (Method::LoggerClearPending, "logger.clear_pending"),
        ];

        for (method, expected_name) in methods {
            let request = Request::new(method.clone());
            let json = request.to_json().unwrap();
            assert!(
                json.contains(&format!("\"method\":\"{}\"", expected_name)),
                "Method {:?} should serialize to {}",
                method,
                expected_name
            );
        }
    }

    #[test]
    fn test_init_params_accept_numeric_string_port() {
        let json = r#"{"hostName":"logs.example.com","port":"5514","programName":"app","machineName":"web-1"}"#;
        let params: InitLoggerParams = serde_json::from_str(json).unwrap();

        assert_eq!(params.host_name, "logs.example.com");
        assert_eq!(params.port.normalize().unwrap(), 5514);
    }

    #[test]
    fn test_init_params_accept_numeric_port() {
        let json = r#"{"hostName":"h","port":5514,"programName":"p","machineName":"m"}"#;
        let params: InitLoggerParams = serde_json::from_str(json).unwrap();

        assert_eq!(params.port.normalize().unwrap(), 5514);
    }

    #[test]
    fn test_log_params_level_defaults_to_none() {
        let params: LogParams = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(params.message, "hi");
        assert!(params.level.is_none());

        let params: LogParams =
            serde_json::from_str(r#"{"message":"hi","level":"warning"}"#).unwrap();
        assert_eq!(params.level, Some(LogLevel::Warning));
    }

    #[test]
    fn test_response_success() {
        let response = Response::success("123", serde_json::json!({ "status": "ok" }));
        let json = response.to_json().unwrap();

        assert!(json.contains("\"id\":\"123\""));
        assert!(json.contains("\"status\":\"ok\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_response_error() {
        let response = Response::error("123", error_codes::METHOD_NOT_FOUND, "Unknown method");
        let json = response.to_json().unwrap();

        assert!(json.contains("\"code\":-32601"));
        assert!(json.contains("\"message\":\"Unknown method\""));
        assert!(!json.contains("\"result\""));
        assert!(!response.is_success());
    }

    #[test]
    fn test_request_from_json_invalid() {
        assert!(Request::from_json("not json").is_err());
        assert!(Request::from_json(r#"{"id":"123"}"#).is_err());
        assert!(Request::from_json(r#"{"id":"123","method":"logger.unknown"}"#).is_err());
    }

    #[test]
    fn test_request_id_uniqueness() {
        let req1 = Request::new(Method::Health);
        let req2 = Request::new(Method::Health);
        assert_ne!(req1.id, req2.id);
    }
}
