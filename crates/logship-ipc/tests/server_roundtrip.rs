//! End-to-end round trip: IPC client -> server -> engine -> TCP
//! collector.

use logship_engine::{DeliveryEngine, RetryPolicy, StaticReachability, TcpLogSink};
use logship_ipc::{error_codes, IpcClient, IpcServer, Method};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Local TCP collector that forwards received lines.
async fn spawn_collector() -> (u16, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stream).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let _ = tx.send(line);
                }
            });
        }
    });

    (port, rx)
}

async fn start_server(socket_path: &str) -> Arc<IpcServer> {
    let engine = DeliveryEngine::new(
        Arc::new(TcpLogSink::new()),
        Arc::new(StaticReachability::new()),
        RetryPolicy::default(),
    );
    let server = Arc::new(IpcServer::new(socket_path, engine));

    let run = server.clone();
    tokio::spawn(async move {
        run.run().await.unwrap();
    });

    // Wait for the socket to come up.
    let client = IpcClient::new(socket_path);
    for _ in 0..100 {
        if client.is_daemon_running().await {
            return server;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("server did not come up");
}

#[tokio::test]
async fn test_full_roundtrip_to_collector() {
    let (collector_port, mut received) = spawn_collector().await;
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("logshipd.sock");
    let socket_path = socket_path.to_str().unwrap();

    let server = start_server(socket_path).await;
    let client = IpcClient::new(socket_path);

    // Logger surface rejects user-id before init.
    let response = client
        .call_method_with_params(Method::LoggerSetUserId, serde_json::json!({"userId": "u1"}))
        .await
        .unwrap();
    assert_eq!(response.error.unwrap().code, error_codes::NOT_INITIALIZED);

    // Invalid port is rejected without touching state.
    let response = client
        .call_method_with_params(
            Method::LoggerInit,
            serde_json::json!({
                "hostName": "127.0.0.1",
                "port": "abc",
                "programName": "app",
                "machineName": "web-1",
            }),
        )
        .await
        .unwrap();
    assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);

    // Numeric-string port works.
    let response = client
        .call_method_with_params(
            Method::LoggerInit,
            serde_json::json!({
                "hostName": "127.0.0.1",
                "port": collector_port.to_string(),
                "programName": "app",
                "machineName": "web-1",
            }),
        )
        .await
        .unwrap();
    assert!(response.is_success(), "init failed: {:?}", response.error);

    // Wait until the engine reports ready.
    for _ in 0..200 {
        let response = client.call_method(Method::LoggerStatus).await.unwrap();
        let result = response.result.unwrap();
        if result["loggerReady"] == true {
            assert_eq!(result["hostName"], "127.0.0.1");
            assert_eq!(result["port"], collector_port);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let response = client
        .call_method_with_params(Method::LoggerSetUserId, serde_json::json!({"userId": "u1"}))
        .await
        .unwrap();
    assert!(response.is_success());

    let response = client
        .call_method_with_params(
            Method::LoggerLog,
            serde_json::json!({"message": "hello from ipc", "level": "warning"}),
        )
        .await
        .unwrap();
    assert!(response.is_success());

    let line = tokio::time::timeout(Duration::from_secs(5), received.recv())
        .await
        .expect("no line within 5s")
        .expect("collector closed");
    assert!(line.contains("u1-app: hello from ipc"), "line: {line}");
    assert!(line.starts_with("<132>"), "line: {line}");

    let response = client.call_method(Method::LoggerStatus).await.unwrap();
    assert_eq!(response.result.unwrap()["pendingLogs"], 0);

    // Shutdown stops the accept loop and removes the socket.
    let response = client.call_method(Method::Shutdown).await.unwrap();
    assert!(response.is_success());
    let mut shutdown_rx = server.shutdown_receiver();
    let _ = tokio::time::timeout(Duration::from_secs(1), shutdown_rx.recv()).await;
    for _ in 0..100 {
        if !client.is_daemon_running().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!client.is_daemon_running().await);
}

#[tokio::test]
async fn test_malformed_request_gets_parse_error() {
    use tokio::io::AsyncWriteExt;
    use tokio::net::UnixStream;

    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("logshipd.sock");
    let socket_path = socket_path.to_str().unwrap();
    let server = start_server(socket_path).await;

    let stream = UnixStream::connect(socket_path).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    writer.write_all(b"this is not json\n").await.unwrap();
    writer.flush().await.unwrap();

    let mut line = String::new();
    BufReader::new(reader).read_line(&mut line).await.unwrap();
    let response: logship_ipc::Response = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(response.error.unwrap().code, error_codes::PARSE_ERROR);

    server.shutdown();
}
