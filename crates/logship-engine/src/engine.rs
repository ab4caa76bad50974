//! Delivery engine facade.

use crate::config::{EndpointConfig, PortInput, RetryPolicy};
use crate::error::{EngineError, EngineResult};
use crate::event::{LogEvent, LogLevel};
use crate::queue::OfflineQueue;
use crate::reachability::ReachabilityMonitor;
use crate::sink::LogSink;
use crate::status::StatusSnapshot;
use crate::supervisor::ConnectionSupervisor;
use crate::syslog;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Accepts log events and guarantees their eventual delivery to the
/// configured collector.
///
/// Every caller-facing operation is non-blocking: it either performs
/// a quick ready-check-and-send, or appends to the offline queue and
/// wakes the supervisor. Backoff waits live on the supervisor task.
///
/// # Delivery contract
///
/// `log` means "accepted for delivery", not "delivered". Transport
/// failures are absorbed (enqueue + retry); [`DeliveryEngine::get_status`]
/// is the only visible signal of trouble.
pub struct DeliveryEngine {
    sink: Arc<dyn LogSink>,
    queue: OfflineQueue,
    supervisor: ConnectionSupervisor,
    initialized: AtomicBool,
    user_id: Mutex<Option<String>>,
}

impl DeliveryEngine {
    /// Create an engine and spawn its background tasks.
    pub fn new(
        sink: Arc<dyn LogSink>,
        monitor: Arc<dyn ReachabilityMonitor>,
        policy: RetryPolicy,
    ) -> Arc<Self> {
        let supervisor = ConnectionSupervisor::spawn(sink.clone(), monitor, policy);
        let engine = Arc::new(Self {
            sink,
            queue: OfflineQueue::new(),
            supervisor,
            initialized: AtomicBool::new(false),
            user_id: Mutex::new(None),
        });
        engine.spawn_drain_task();
        engine
    }

    /// Drain the offline queue on every readiness edge.
    fn spawn_drain_task(self: &Arc<Self>) {
        let engine = Arc::downgrade(self);
        let mut ready_rx = self.supervisor.ready_watch();
        tokio::spawn(async move {
            while ready_rx.changed().await.is_ok() {
                if !*ready_rx.borrow_and_update() {
                    continue;
                }
                let Some(engine) = engine.upgrade() else { break };
                engine.drain().await;
            }
        });
    }

    /// Validate and apply an endpoint config.
    ///
    /// Fails with `InvalidConfig` on empty strings or an invalid port
    /// (accepted as a number or a numeric string, 1-65535). On
    /// success the supervisor tears down any prior connection and
    /// starts connecting; this call does not wait for the connect.
    pub fn init_logger(
        &self,
        host: &str,
        port: impl Into<PortInput>,
        program_name: &str,
        machine_name: &str,
    ) -> EngineResult<()> {
        let config = EndpointConfig::new(host, port, program_name, machine_name)?;
        self.supervisor.configure(config);
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Set the user tag decorating the program name on shipped lines.
    ///
    /// Pure config change; connection state is untouched.
    pub fn set_user_id(&self, user_id: &str) -> EngineResult<()> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(EngineError::NotInitialized);
        }
        let trimmed = user_id.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidArgument(
                "userId must not be empty".to_string(),
            ));
        }
        *self.user_id.lock().expect("user_id lock poisoned") = Some(trimmed.to_string());
        Ok(())
    }

    /// Accept a log event for delivery.
    ///
    /// Sends immediately while ready; otherwise (or on a send
    /// failure) the event is queued and a reconnect is triggered. The
    /// call returns as soon as the event is accepted; it never waits
    /// for retries and never surfaces transport errors.
    pub async fn log(&self, message: &str, level: LogLevel) -> EngineResult<()> {
        if message.is_empty() {
            return Err(EngineError::InvalidArgument(
                "message must not be empty".to_string(),
            ));
        }

        let event = LogEvent::new(message, level);
        if self.supervisor.is_ready() {
            if let Some(config) = self.supervisor.current_config() {
                let line = syslog::format_line(&config, self.user_id().as_deref(), &event);
                match self.sink.send(&line).await {
                    Ok(()) => {
                        debug!(level = %level, "Log transmitted");
                        return Ok(());
                    }
                    Err(e) => {
                        warn!(error = %e, "Send failed; queueing for redelivery");
                        self.queue.enqueue(event).await;
                        self.supervisor.connection_lost();
                        return Ok(());
                    }
                }
            }
        }

        self.queue.enqueue(event).await;
        self.supervisor.force_reconnect();
        Ok(())
    }

    /// One immediate drain attempt against the current sink state.
    ///
    /// Returns after attempting once; entries that still fail remain
    /// queued for the next readiness transition.
    pub async fn flush(&self) {
        self.drain().await;
    }

    /// Explicitly discard all pending events. Returns the dropped
    /// count. This is the only way queued events are lost.
    pub async fn clear_pending(&self) -> usize {
        let dropped = self.queue.clear().await;
        if dropped > 0 {
            info!(dropped, "Cleared pending log events");
        }
        dropped
    }

    /// Snapshot current status. Pure read, no side effects.
    pub async fn get_status(&self) -> StatusSnapshot {
        let (state, config) = self.supervisor.state_and_config();
        StatusSnapshot::project(
            self.initialized.load(Ordering::SeqCst),
            state,
            config.as_ref(),
            self.sink.is_connected(),
            self.queue.len().await,
        )
    }

    /// Cancel any backoff wait and attempt a reconnect now.
    pub fn force_reconnect(&self) {
        self.supervisor.force_reconnect();
    }

    fn user_id(&self) -> Option<String> {
        self.user_id.lock().expect("user_id lock poisoned").clone()
    }

    /// Transmit queued events in FIFO order.
    ///
    /// On the first failure the failed event and the remaining suffix
    /// go back to the head of the queue in their original order and
    /// the drain stops; the same happens if the endpoint is
    /// reconfigured mid-drain (the old sink must not complete it).
    async fn drain(&self) {
        let generation = self.supervisor.generation();
        let events = self.queue.drain_all().await;
        if events.is_empty() {
            return;
        }

        let Some(config) = self.supervisor.current_config() else {
            self.queue.requeue_front(events).await;
            return;
        };
        let user_id = self.user_id();

        debug!(count = events.len(), "Draining offline queue");
        let mut events = events.into_iter();
        let mut sent = 0usize;
        while let Some(event) = events.next() {
            if self.supervisor.generation() != generation {
                debug!("Endpoint reconfigured mid-drain; abandoning");
                let mut rest = vec![event];
                rest.extend(events);
                self.queue.requeue_front(rest).await;
                return;
            }
            let line = syslog::format_line(&config, user_id.as_deref(), &event);
            if let Err(e) = self.sink.send(&line).await {
                warn!(error = %e, delivered = sent, "Drain interrupted; re-queueing undelivered events");
                let mut rest = vec![event];
                rest.extend(events);
                self.queue.requeue_front(rest).await;
                self.supervisor.connection_lost();
                return;
            }
            sent += 1;
        }
        info!(count = sent, "Offline queue drained");
    }
}
