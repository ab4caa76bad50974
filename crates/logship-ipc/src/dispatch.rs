//! Request dispatch against the delivery engine.

use crate::protocol::{
    error_codes, InitLoggerParams, LogParams, Method, Request, Response, SetUserIdParams,
};
use logship_engine::{DeliveryEngine, EngineError, LogLevel};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Maps IPC requests onto engine operations.
///
/// Engine errors stay synchronous and caller-visible; delivery
/// trouble never does (a `logger.log` whose transport fails still
/// succeeds, the event is queued).
#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<DeliveryEngine>,
}

impl Dispatcher {
    pub fn new(engine: Arc<DeliveryEngine>) -> Self {
        Self { engine }
    }

    /// Handle one request and produce its response.
    pub async fn dispatch(&self, request: Request) -> Response {
        let id = request.id.clone();
        debug!(method = ?request.method, id = %id, "Dispatching request");

        match request.method {
            Method::Health => Response::success(&id, serde_json::json!({ "status": "ok" })),
            Method::Shutdown => Response::success(&id, serde_json::json!({ "stopping": true })),
            Method::LoggerInit => {
                let params: InitLoggerParams = match parse_params(&request) {
                    Ok(p) => p,
                    Err(response) => return response,
                };
                match self.engine.init_logger(
                    &params.host_name,
                    params.port,
                    &params.program_name,
                    &params.machine_name,
                ) {
                    Ok(()) => Response::success(&id, serde_json::json!({ "initialized": true })),
                    Err(e) => engine_error(&id, e),
                }
            }
            Method::LoggerSetUserId => {
                let params: SetUserIdParams = match parse_params(&request) {
                    Ok(p) => p,
                    Err(response) => return response,
                };
                match self.engine.set_user_id(&params.user_id) {
                    Ok(()) => Response::success(&id, serde_json::json!({ "userIdSet": true })),
                    Err(e) => engine_error(&id, e),
                }
            }
            Method::LoggerLog => {
                let params: LogParams = match parse_params(&request) {
                    Ok(p) => p,
                    Err(response) => return response,
                };
                let level = params.level.unwrap_or(LogLevel::Info);
                match self.engine.log(&params.message, level).await {
                    Ok(()) => Response::success(&id, serde_json::json!({ "accepted": true })),
                    Err(e) => engine_error(&id, e),
                }
            }
            Method::LoggerStatus => {
                let status = self.engine.get_status().await;
                match serde_json::to_value(&status) {
                    Ok(value) => Response::success(&id, value),
                    Err(e) => Response::error(&id, error_codes::INTERNAL_ERROR, &e.to_string()),
                }
            }
            Method::LoggerFlush => {
                self.engine.flush().await;
                let pending = self.engine.get_status().await.pending_logs;
                Response::success(&id, serde_json::json!({ "pendingLogs": pending }))
            }
            Method::LoggerForceReconnect => {
                self.engine.force_reconnect();
                Response::success(&id, serde_json::json!({ "reconnecting": true }))
            }
            Method::LoggerClearPending => {
                let dropped = self.engine.clear_pending().await;
                Response::success(&id, serde_json::json!({ "dropped": dropped }))
            }
        }
    }
}

fn parse_params<T: DeserializeOwned>(request: &Request) -> Result<T, Response> {
    let value = request.params.clone().unwrap_or(serde_json::Value::Null);
    serde_json::from_value(value).map_err(|e| {
        Response::error(
            &request.id,
            error_codes::INVALID_PARAMS,
            &format!("Invalid params: {}", e),
        )
    })
}

fn engine_error(id: &str, err: EngineError) -> Response {
    let code = match err {
        EngineError::NotInitialized => error_codes::NOT_INITIALIZED,
        EngineError::InvalidConfig(_) | EngineError::InvalidArgument(_) => {
            error_codes::INVALID_PARAMS
        }
    };
    Response::error(id, code, &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use logship_engine::{RetryPolicy, StaticReachability, TcpLogSink};

    fn dispatcher() -> Dispatcher {
        let engine = DeliveryEngine::new(
            Arc::new(TcpLogSink::new()),
            Arc::new(StaticReachability::new()),
            RetryPolicy::default(),
        );
        Dispatcher::new(engine)
    }

    #[tokio::test]
    async fn test_health() {
        let response = dispatcher().dispatch(Request::new(Method::Health)).await;
        assert!(response.is_success());
        assert_eq!(response.result.unwrap()["status"], "ok");
    }

    #[tokio::test]
    async fn test_set_user_id_before_init_maps_to_not_initialized() {
        let request = Request::with_params(
            Method::LoggerSetUserId,
            serde_json::json!({ "userId": "u42" }),
        );
        let response = dispatcher().dispatch(request).await;
        assert_eq!(response.error.unwrap().code, error_codes::NOT_INITIALIZED);
    }

    #[tokio::test]
    async fn test_init_with_invalid_port_maps_to_invalid_params() {
        let request = Request::with_params(
            Method::LoggerInit,
            serde_json::json!({
                "hostName": "h",
                "port": "abc",
                "programName": "p",
                "machineName": "m",
            }),
        );
        let response = dispatcher().dispatch(request).await;
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_log_before_init_is_accepted() {
        let dispatcher = dispatcher();
        let request =
            Request::with_params(Method::LoggerLog, serde_json::json!({ "message": "early" }));
        let response = dispatcher.dispatch(request).await;
        assert!(response.is_success());

        let status = dispatcher
            .dispatch(Request::new(Method::LoggerStatus))
            .await;
        let result = status.result.unwrap();
        assert_eq!(result["initialized"], false);
        assert_eq!(result["pendingLogs"], 1);
    }

    #[tokio::test]
    async fn test_missing_params_rejected() {
        let response = dispatcher().dispatch(Request::new(Method::LoggerInit)).await;
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_clear_pending_reports_dropped() {
        let dispatcher = dispatcher();
        for _ in 0..2 {
            let request =
                Request::with_params(Method::LoggerLog, serde_json::json!({ "message": "x" }));
            assert!(dispatcher.dispatch(request).await.is_success());
        }

        let response = dispatcher
            .dispatch(Request::new(Method::LoggerClearPending))
            .await;
        assert_eq!(response.result.unwrap()["dropped"], 2);
    }

    #[tokio::test]
    async fn test_status_uses_camel_case_keys() {
        let response = dispatcher()
            .dispatch(Request::new(Method::LoggerStatus))
            .await;
        let result = response.result.unwrap();
        assert!(result.get("loggerReady").is_some());
        assert!(result.get("pendingLogs").is_some());
        assert!(result.get("hostName").is_some());
    }
}
