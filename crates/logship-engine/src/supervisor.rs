//! Connection lifecycle supervision and retry policy.
//!
//! The supervisor owns the sink's lifecycle on a background task
//! driven by three sources: a command channel (configure,
//! force-reconnect, connection-lost), the reachability watch, and a
//! scheduled retry timer. All backoff waits happen here, never on a
//! caller path.

use crate::config::{EndpointConfig, RetryPolicy};
use crate::reachability::ReachabilityMonitor;
use crate::sink::LogSink;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No endpoint config has ever been applied.
    Uninitialized,
    /// A connect attempt is in flight.
    Connecting,
    /// The sink is connected and accepting lines.
    Ready,
    /// A previously ready connection was lost.
    Disconnected,
    /// Waiting between reconnect attempts. Never terminal: a
    /// reachability edge or force-reconnect always re-arms retries.
    ReconnectBackoff,
}

/// Commands accepted by the supervisor task.
enum Command {
    Configure(EndpointConfig),
    ForceReconnect,
    ConnectionLost,
}

struct Inner {
    state: ConnectionState,
    config: Option<EndpointConfig>,
}

struct Shared {
    /// State and config live under one lock so status reads are never
    /// torn across the two.
    inner: Mutex<Inner>,
    /// Bumped on every reconfigure; in-flight drains abandon when it
    /// moves.
    generation: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        self.inner.lock().expect("supervisor state lock poisoned").state = state;
    }

    fn state(&self) -> ConnectionState {
        self.inner.lock().expect("supervisor state lock poisoned").state
    }

    fn config(&self) -> Option<EndpointConfig> {
        self.inner
            .lock()
            .expect("supervisor state lock poisoned")
            .config
            .clone()
    }
}

/// Handle to the supervisor background task.
///
/// Cheap to clone; all clones share the same task and state.
#[derive(Clone)]
pub struct ConnectionSupervisor {
    shared: Arc<Shared>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    ready_rx: watch::Receiver<bool>,
    sink: Arc<dyn LogSink>,
}

impl ConnectionSupervisor {
    /// Spawn the supervisor task.
    pub fn spawn(
        sink: Arc<dyn LogSink>,
        monitor: Arc<dyn ReachabilityMonitor>,
        policy: RetryPolicy,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: ConnectionState::Uninitialized,
                config: None,
            }),
            generation: AtomicU64::new(0),
        });

        let worker = Worker {
            shared: shared.clone(),
            sink: sink.clone(),
            policy,
            ready_tx,
            reach_rx: monitor.subscribe(),
        };
        tokio::spawn(worker.run(cmd_rx));

        Self {
            shared,
            cmd_tx,
            ready_rx,
            sink,
        }
    }

    /// Apply a new endpoint config.
    ///
    /// Tears down any prior sink connection before rebuilding, and
    /// bumps the drain generation so drains against the old sink are
    /// abandoned rather than completed. Idempotent: applying the same
    /// config twice still yields exactly one active connection.
    pub fn configure(&self, config: EndpointConfig) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut inner = self.shared.inner.lock().expect("supervisor state lock poisoned");
            inner.config = Some(config.clone());
            inner.state = ConnectionState::Connecting;
        }
        let _ = self.cmd_tx.send(Command::Configure(config));
    }

    /// Cancel any in-progress backoff wait and attempt a connect now.
    pub fn force_reconnect(&self) {
        let _ = self.cmd_tx.send(Command::ForceReconnect);
    }

    /// Report a lost connection observed outside the supervisor (e.g.
    /// a send that failed while ready). Ignored unless the connection
    /// was Ready; the retry that follows fires immediately.
    pub fn connection_lost(&self) {
        let _ = self.cmd_tx.send(Command::ConnectionLost);
    }

    /// Whether lines can be transmitted right now.
    ///
    /// True only while the state machine is Ready *and* the sink still
    /// reports a live connection.
    pub fn is_ready(&self) -> bool {
        self.shared.state() == ConnectionState::Ready && self.sink.is_connected()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Currently applied endpoint config, if any.
    pub fn current_config(&self) -> Option<EndpointConfig> {
        self.shared.config()
    }

    /// Consistent snapshot of state and config.
    pub fn state_and_config(&self) -> (ConnectionState, Option<EndpointConfig>) {
        let inner = self.shared.inner.lock().expect("supervisor state lock poisoned");
        (inner.state, inner.config.clone())
    }

    /// Readiness subscription; the false-to-true edge signals that the
    /// offline queue should drain.
    pub fn ready_watch(&self) -> watch::Receiver<bool> {
        self.ready_rx.clone()
    }

    /// Drain generation. Moves on every reconfigure.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }
}

struct Worker {
    shared: Arc<Shared>,
    sink: Arc<dyn LogSink>,
    policy: RetryPolicy,
    ready_tx: watch::Sender<bool>,
    reach_rx: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<Command>) {
        let mut reachable = *self.reach_rx.borrow_and_update();
        let mut reach_alive = true;
        // Scheduled retry, if any, and the attempt count within the
        // current backoff round.
        let mut retry_at: Option<Instant> = None;
        let mut attempt: u32 = 0;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    match cmd {
                        Command::Configure(config) => {
                            self.sink.disconnect().await;
                            self.set_ready(false);
                            self.shared.set_state(ConnectionState::Connecting);
                            attempt = 0;
                            retry_at = None;
                            info!(host = %config.host, port = config.port, "Applying endpoint config");
                            if !self.try_connect(&config).await {
                                attempt = 1;
                                retry_at = self.schedule_retry(attempt, reachable);
                            }
                        }
                        Command::ForceReconnect => {
                            let Some(config) = self.shared.config() else {
                                debug!("Force reconnect ignored; no endpoint configured");
                                continue;
                            };
                            debug!("Force reconnect requested");
                            retry_at = None;
                            attempt = 0;
                            self.sink.disconnect().await;
                            self.set_ready(false);
                            self.shared.set_state(ConnectionState::Connecting);
                            if !self.try_connect(&config).await {
                                attempt = 1;
                                retry_at = self.schedule_retry(attempt, reachable);
                            }
                        }
                        Command::ConnectionLost => {
                            if self.shared.state() == ConnectionState::Ready {
                                warn!("Sink connection lost");
                                self.set_ready(false);
                                self.sink.disconnect().await;
                                self.shared.set_state(ConnectionState::Disconnected);
                                // Disconnected -> ReconnectBackoff is automatic;
                                // the first retry fires immediately.
                                self.shared.set_state(ConnectionState::ReconnectBackoff);
                                attempt = 0;
                                retry_at = Some(Instant::now());
                            }
                        }
                    }
                }
                changed = self.reach_rx.changed(), if reach_alive => {
                    if changed.is_err() {
                        reach_alive = false;
                        continue;
                    }
                    let now_reachable = *self.reach_rx.borrow_and_update();
                    if now_reachable == reachable {
                        continue;
                    }
                    reachable = now_reachable;
                    if reachable {
                        if self.shared.state() == ConnectionState::ReconnectBackoff
                            && self.shared.config().is_some()
                        {
                            info!("Network reachable again; scheduling reconnect");
                            attempt = 0;
                            retry_at = Some(Instant::now() + self.policy.settle_delay);
                        }
                    } else {
                        match self.shared.state() {
                            ConnectionState::Ready => {
                                warn!("Network unreachable; dropping connection");
                                self.set_ready(false);
                                self.sink.disconnect().await;
                                self.shared.set_state(ConnectionState::Disconnected);
                                self.shared.set_state(ConnectionState::ReconnectBackoff);
                                attempt = 0;
                                retry_at = None;
                            }
                            ConnectionState::Connecting | ConnectionState::ReconnectBackoff => {
                                debug!("Network unreachable; pausing reconnect attempts");
                                self.shared.set_state(ConnectionState::ReconnectBackoff);
                                retry_at = None;
                            }
                            _ => {}
                        }
                    }
                }
                _ = sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    retry_at = None;
                    let Some(config) = self.shared.config() else { continue };
                    self.shared.set_state(ConnectionState::Connecting);
                    if self.try_connect(&config).await {
                        attempt = 0;
                    } else {
                        attempt += 1;
                        retry_at = self.schedule_retry(attempt, reachable);
                    }
                }
            }
        }
    }

    async fn try_connect(&self, config: &EndpointConfig) -> bool {
        match self.sink.connect(&config.host, config.port).await {
            Ok(()) => {
                info!(host = %config.host, port = config.port, "Sink connected");
                self.shared.set_state(ConnectionState::Ready);
                self.set_ready(true);
                true
            }
            Err(e) => {
                warn!(host = %config.host, port = config.port, error = %e, "Sink connect failed");
                false
            }
        }
    }

    /// Enter backoff and schedule the next retry, or park until an
    /// external trigger when attempts are exhausted or the network is
    /// down.
    fn schedule_retry(&self, attempt: u32, reachable: bool) -> Option<Instant> {
        self.shared.set_state(ConnectionState::ReconnectBackoff);
        if !reachable {
            debug!("Network unreachable; waiting for reachability before retrying");
            return None;
        }
        if attempt >= self.policy.max_attempts {
            warn!(
                attempts = attempt,
                "Reconnect attempts exhausted; waiting for reachability change or force-reconnect"
            );
            return None;
        }
        let delay = self.policy.delay_for_attempt(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect attempt");
        Some(Instant::now() + delay)
    }

    fn set_ready(&self, ready: bool) {
        self.ready_tx.send_if_modified(|current| {
            if *current != ready {
                *current = ready;
                true
            } else {
                false
            }
        });
    }
}
