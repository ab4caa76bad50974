//! Network reachability subscription.

use tokio::sync::watch;

/// Observes host-level network reachability.
///
/// Subscriptions are edge-triggered: receivers wake only when the
/// reachable flag actually changes, not on every poll. How the host
/// determines reachability is outside the engine.
pub trait ReachabilityMonitor: Send + Sync {
    /// Subscribe to reachability changes. The receiver's current
    /// value is the latest known state.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Monitor that always reports the host as reachable.
///
/// Used when no platform reachability source is wired in; the engine
/// then relies purely on sink errors and retry timers.
pub struct StaticReachability {
    tx: watch::Sender<bool>,
}

impl StaticReachability {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(true);
        Self { tx }
    }
}

impl Default for StaticReachability {
    fn default() -> Self {
        Self::new()
    }
}

impl ReachabilityMonitor for StaticReachability {
    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Manually driven monitor, for embedding platform callbacks (and for
/// tests).
pub struct ManualReachability {
    tx: watch::Sender<bool>,
}

impl ManualReachability {
    /// Create a monitor with the given initial state.
    pub fn new(initial: bool) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Report a new reachability state. Subscribers wake only on edges.
    pub fn set_reachable(&self, reachable: bool) {
        self.tx.send_if_modified(|current| {
            if *current != reachable {
                *current = reachable;
                true
            } else {
                false
            }
        });
    }
}

impl ReachabilityMonitor for ManualReachability {
    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
