//! Log sink abstraction and the default TCP implementation.

use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Transmits formatted log lines to the remote collector over a live
/// connection.
///
/// `is_connected` is a first-class capability: the engine never
/// inspects transport internals to decide readiness.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Open a connection to the endpoint, replacing any prior one.
    async fn connect(&self, host: &str, port: u16) -> io::Result<()>;

    /// Whether a live connection is currently held.
    fn is_connected(&self) -> bool;

    /// Transmit one formatted line.
    async fn send(&self, line: &str) -> io::Result<()>;

    /// Tear down the connection, if any.
    async fn disconnect(&self);
}

/// Default connect timeout for [`TcpLogSink`].
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Newline-framed TCP sink.
///
/// Drops the connection on any write error so the supervisor sees the
/// loss on the next readiness check.
pub struct TcpLogSink {
    stream: Mutex<Option<TcpStream>>,
    connected: AtomicBool,
    connect_timeout: Duration,
}

impl TcpLogSink {
    /// Create a disconnected sink with the default connect timeout.
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a disconnected sink with a custom connect timeout.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self {
            stream: Mutex::new(None),
            connected: AtomicBool::new(false),
            connect_timeout,
        }
    }

    fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Default for TcpLogSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogSink for TcpLogSink {
    async fn connect(&self, host: &str, port: u16) -> io::Result<()> {
        let mut guard = self.stream.lock().await;
        if guard.take().is_some() {
            self.mark_disconnected();
            debug!("Dropped previous connection before reconnecting");
        }

        let stream = timeout(self.connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;
        stream.set_nodelay(true)?;

        *guard = Some(stream);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, line: &str) -> io::Result<()> {
        let mut guard = self.stream.lock().await;
        let stream = guard
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no active connection"))?;

        let result = async {
            stream.write_all(line.as_bytes()).await?;
            stream.write_all(b"\n").await?;
            stream.flush().await
        }
        .await;

        if let Err(ref e) = result {
            warn!(error = %e, "TCP sink write failed; dropping connection");
            *guard = None;
            self.mark_disconnected();
        }
        result
    }

    async fn disconnect(&self) {
        let mut guard = self.stream.lock().await;
        if guard.take().is_some() {
            debug!("TCP sink disconnected");
        }
        self.mark_disconnected();
    }
}
