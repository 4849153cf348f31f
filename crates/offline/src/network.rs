//! Network state monitoring
//!
//! Purely event-driven: the platform glue calls [`NetworkMonitor::handle_online`]
//! and [`NetworkMonitor::handle_offline`] on connectivity transitions, and
//! consumers either poll the snapshot or subscribe to the broadcast channel.
//! The `was_offline` flag is sticky so that an online transition after any
//! disconnection is exposed as a one-shot "just reconnected" edge.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Connectivity transition events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkEvent {
    /// Connectivity restored.
    Online,
    /// Connectivity lost.
    Offline,
    /// Connectivity restored after having been offline; emitted once per
    /// reconnection, alongside `Online`.
    JustReconnected,
}

/// Ephemeral connectivity snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    pub is_online: bool,
    /// Set on the first offline transition and never auto-cleared.
    pub was_offline: bool,
}

/// Observes connectivity transitions and exposes current state plus the
/// reconnection edge.
pub struct NetworkMonitor {
    is_online: AtomicBool,
    was_offline: AtomicBool,
    events: broadcast::Sender<NetworkEvent>,
}

impl NetworkMonitor {
    /// Create a monitor with the connectivity observed at construction time.
    pub fn new(initially_online: bool) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            is_online: AtomicBool::new(initially_online),
            was_offline: AtomicBool::new(false),
            events,
        }
    }

    /// Platform callback: connectivity lost.
    pub fn handle_offline(&self) {
        self.is_online.store(false, Ordering::SeqCst);
        self.was_offline.store(true, Ordering::SeqCst);
        tracing::info!("network offline");
        let _ = self.events.send(NetworkEvent::Offline);
    }

    /// Platform callback: connectivity restored. Emits `JustReconnected`
    /// when a disconnection preceded this transition.
    pub fn handle_online(&self) {
        self.is_online.store(true, Ordering::SeqCst);
        tracing::info!("network online");
        let _ = self.events.send(NetworkEvent::Online);

        if self.was_offline.load(Ordering::SeqCst) {
            let _ = self.events.send(NetworkEvent::JustReconnected);
        }
    }

    pub fn is_online(&self) -> bool {
        self.is_online.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> NetworkState {
        NetworkState {
            is_online: self.is_online.load(Ordering::SeqCst),
            was_offline: self.was_offline.load(Ordering::SeqCst),
        }
    }

    /// Subscribe to connectivity transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.events.subscribe()
    }
}
