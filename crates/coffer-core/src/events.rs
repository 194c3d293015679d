//! Vault notifications.
//!
//! The vault fires one notification per stored, accessed, or evicted record
//! through a [`NotificationSink`]. Delivery is fire-and-forget: sinks cannot
//! fail a vault operation, and the vault never waits on a consumer.
//!
//! Notifications carry the record as persisted (sealed payload included) but
//! never the decrypted value.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use coffer_storage::SecretRecord;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultEvent {
    /// Written by `put`.
    Stored,
    /// Decrypted by `get`.
    Accessed,
    /// Removed because its eviction policy fired.
    Evicted,
}

impl fmt::Display for VaultEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored => f.write_str("stored"),
            Self::Accessed => f.write_str("accessed"),
            Self::Evicted => f.write_str("evicted"),
        }
    }
}

/// An event together with the record it concerns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub event: VaultEvent,
    pub record: SecretRecord,
}

/// Receiver of vault notifications.
pub trait NotificationSink: Send + Sync + fmt::Debug {
    fn notify(&self, event: VaultEvent, record: &SecretRecord);
}

/// Logs every notification through `tracing`. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: VaultEvent, record: &SecretRecord) {
        let owner = record.owner.as_ref().map(ToString::to_string);
        match event {
            VaultEvent::Evicted => info!(
                %event,
                key = %record.key,
                owner = owner.as_deref(),
                value_type = %record.value_type,
                policy = record.eviction_policy.as_deref(),
                "secret evicted"
            ),
            VaultEvent::Stored | VaultEvent::Accessed => debug!(
                %event,
                key = %record.key,
                owner = owner.as_deref(),
                value_type = %record.value_type,
                access_count = record.access_count,
                "secret {event}"
            ),
        }
    }
}

/// Publishes notifications on a tokio broadcast channel.
///
/// Notifications sent while nobody is subscribed are dropped, and slow
/// subscribers observe `RecvError::Lagged` rather than blocking the vault.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastSink {
    /// A sink buffering up to `capacity` notifications per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl NotificationSink for BroadcastSink {
    fn notify(&self, event: VaultEvent, record: &SecretRecord) {
        let notification = Notification {
            event,
            record: record.clone(),
        };
        if self.sender.send(notification).is_err() {
            trace!(%event, key = %record.key, "no notification subscribers");
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    received: Arc<Mutex<Vec<Notification>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications received so far, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Event kinds received so far, oldest first.
    pub fn events(&self) -> Vec<VaultEvent> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|n| n.event)
            .collect()
    }

    /// How many notifications of `event` were received.
    pub fn count(&self, event: VaultEvent) -> usize {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|n| n.event == event)
            .count()
    }

    pub fn clear(&self) {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, event: VaultEvent, record: &SecretRecord) {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Notification {
                event,
                record: record.clone(),
            });
    }
}

/// Forwards every notification to several sinks, in order.
#[derive(Debug, Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl NotificationSink for FanoutSink {
    fn notify(&self, event: VaultEvent, record: &SecretRecord) {
        for sink in &self.sinks {
            sink.notify(event, record);
        }
    }
}
