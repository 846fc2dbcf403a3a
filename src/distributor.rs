//! Best-effort event fan-out to live session subscribers
//!
//! Each session has a dynamic set of independent sinks. Delivery is a
//! non-blocking unbounded channel send, so the subscriber lock is only ever
//! held around list mutation and a slow sink can never stall new subscribers
//! from joining. A sink whose channel has closed is dropped from the registry
//! as a side effect of publishing; the failure never reaches the publisher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::types::ScanEvent;

/// Opaque handle identifying one subscriber registration
pub type SubscriberId = u64;

struct Subscriber {
    id: SubscriberId,
    tx: mpsc::UnboundedSender<ScanEvent>,
}

/// Per-session subscriber registry and broadcast path
///
/// Ordering guarantee: within one session, every subscriber observes events
/// in the exact order `publish` calls are made. This holds because only the
/// owning supervisor task publishes for a given session, and each publish
/// pushes into every sink under the same lock acquisition.
#[derive(Default)]
pub struct EventDistributor {
    subscribers: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl EventDistributor {
    /// Create an empty distributor
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink for one session
    ///
    /// When a snapshot event is supplied it is delivered into the new channel
    /// before the sink becomes visible to `publish`, so a late subscriber
    /// always sees the session's current state ahead of any later event.
    pub fn subscribe(
        &self,
        scan_id: &str,
        snapshot: Option<ScanEvent>,
    ) -> (SubscriberId, mpsc::UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut subscribers = self.subscribers.lock();
        if let Some(event) = snapshot {
            let _ = tx.send(event);
        }
        subscribers
            .entry(scan_id.to_string())
            .or_default()
            .push(Subscriber { id, tx });
        (id, rx)
    }

    /// Remove a registration; safe to call on an already-removed sink
    pub fn unsubscribe(&self, scan_id: &str, subscriber_id: SubscriberId) {
        let mut subscribers = self.subscribers.lock();
        if let Some(sinks) = subscribers.get_mut(scan_id) {
            sinks.retain(|s| s.id != subscriber_id);
            if sinks.is_empty() {
                subscribers.remove(scan_id);
            }
        }
    }

    /// Deliver an event to every currently-registered sink for the session
    ///
    /// A sink whose receiver has gone away is removed; remaining sinks still
    /// get the event.
    pub fn publish(&self, scan_id: &str, event: ScanEvent) {
        let mut subscribers = self.subscribers.lock();
        let Some(sinks) = subscribers.get_mut(scan_id) else {
            return;
        };

        sinks.retain(|s| s.tx.send(event.clone()).is_ok());
        if sinks.is_empty() {
            subscribers.remove(scan_id);
        }
    }

    /// Number of live registrations for a session
    #[must_use]
    pub fn subscriber_count(&self, scan_id: &str) -> usize {
        self.subscribers
            .lock()
            .get(scan_id)
            .map_or(0, Vec::len)
    }
}
