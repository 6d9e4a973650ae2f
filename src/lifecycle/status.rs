//! Status snapshots and their broadcast point.
//!
//! One [`StatusBroadcaster`] lives inside each orchestrator. Observers either
//! register a callback, invoked synchronously in registration order on every
//! emission, or take a broadcast receiver for async consumption.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::lifecycle::Phase;

/// Buffered snapshots per channel receiver before it starts lagging.
const STATUS_CHANNEL_CAPACITY: usize = 16;

/// Phase flags at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub pre_config_ran: bool,
    pub pre_init_ran: bool,
    pub running: bool,
    pub stopped: bool,
    #[serde(rename = "testsOK")]
    pub tests_ok: bool,
    /// Phase whose completion produced this snapshot.
    pub last_phase: Option<Phase>,
}

/// Handle returned by [`StatusBroadcaster::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type StatusCallback = Arc<dyn Fn(&ServerStatus) + Send + Sync>;

/// Publish point for status snapshots.
pub struct StatusBroadcaster {
    subscribers: Mutex<Vec<(SubscriptionId, StatusCallback)>>,
    next_id: AtomicU64,
    tx: broadcast::Sender<ServerStatus>,
    latest: Mutex<Option<ServerStatus>>,
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            tx,
            latest: Mutex::new(None),
        }
    }

    /// Register a callback for every future snapshot.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ServerStatus) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .expect("status subscribers mutex poisoned")
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .lock()
            .expect("status subscribers mutex poisoned");
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    /// Receive snapshots over a channel. Slow receivers lag, they never block emission.
    pub fn subscribe_channel(&self) -> broadcast::Receiver<ServerStatus> {
        self.tx.subscribe()
    }

    /// Publish a snapshot to every observer.
    pub fn emit(&self, status: ServerStatus) {
        *self.latest.lock().expect("status mutex poisoned") = Some(status);

        // Callbacks run outside the lock so they may (un)subscribe.
        let callbacks: Vec<StatusCallback> = self
            .subscribers
            .lock()
            .expect("status subscribers mutex poisoned")
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in callbacks {
            callback(&status);
        }

        let _ = self.tx.send(status);
    }

    /// Most recently emitted snapshot.
    pub fn latest(&self) -> Option<ServerStatus> {
        *self.latest.lock().expect("status mutex poisoned")
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("status subscribers mutex poisoned")
            .len()
            + self.tx.receiver_count()
    }
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StatusBroadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusBroadcaster")
            .field("subscribers", &self.subscriber_count())
            .field("latest", &self.latest())
            .finish()
    }
}
