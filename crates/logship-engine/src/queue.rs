//! Offline queue of not-yet-delivered log events.

use crate::event::LogEvent;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::debug;

/// Ordered buffer of events awaiting delivery.
///
/// Strict FIFO: insertion order is delivery order. Unbounded; grows
/// while the sink is not ready and shrinks only via drain or an
/// explicit clear. No deduplication.
#[derive(Default)]
pub struct OfflineQueue {
    pending: Mutex<VecDeque<LogEvent>>,
}

impl OfflineQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. O(1).
    pub async fn enqueue(&self, event: LogEvent) {
        let mut pending = self.pending.lock().await;
        pending.push_back(event);
        debug!(pending = pending.len(), "Queued event for later delivery");
    }

    /// Atomically remove and return the full ordered contents.
    ///
    /// The caller can retry individual elements without racing
    /// concurrent enqueues during the drain.
    pub async fn drain_all(&self) -> Vec<LogEvent> {
        let mut pending = self.pending.lock().await;
        pending.drain(..).collect()
    }

    /// Return an undelivered suffix to the head of the queue,
    /// preserving its original relative order, ahead of anything
    /// enqueued while the drain was in flight.
    pub async fn requeue_front(&self, events: Vec<LogEvent>) {
        if events.is_empty() {
            return;
        }
        let mut pending = self.pending.lock().await;
        for event in events.into_iter().rev() {
            pending.push_front(event);
        }
    }

    /// Number of pending events.
    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Whether the queue is empty.
    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }

    /// Explicitly discard all pending events. Returns the dropped count.
    pub async fn clear(&self) -> usize {
        let mut pending = self.pending.lock().await;
        let dropped = pending.len();
        pending.clear();
        dropped
    }
}
