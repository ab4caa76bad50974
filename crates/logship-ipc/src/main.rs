//! Logshipd binary entry point.
//!
//! Usage: logshipd [--socket <path>]
//!
//! Serves the logger IPC surface on a Unix domain socket and ships
//! accepted events to the endpoint configured via `logger.init`.

use clap::Parser;
use logship_engine::{DeliveryEngine, RetryPolicy, StaticReachability, TcpLogSink};
use logship_ipc::IpcServer;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Logshipd: resilient log shipping daemon.
#[derive(Parser, Debug)]
#[command(name = "logshipd")]
#[command(about = "Resilient log shipping daemon with offline queueing")]
struct Args {
    /// Path to the IPC socket.
    #[arg(long, env = "LOGSHIPD_SOCKET", default_value = "/tmp/logshipd.sock")]
    socket: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    info!("Logshipd starting...");

    let engine = DeliveryEngine::new(
        Arc::new(TcpLogSink::new()),
        Arc::new(StaticReachability::new()),
        RetryPolicy::default(),
    );

    let server = IpcServer::new(&args.socket, engine);
    info!(socket = %args.socket, "Configuration loaded");

    // Install signal handler for graceful shutdown
    let ctrl_c = tokio::signal::ctrl_c();

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "IPC server exited with error");
                return Err(e.into());
            }
        }
        _ = ctrl_c => {
            info!("Received shutdown signal, exiting...");
            server.shutdown();
        }
    }

    Ok(())
}
