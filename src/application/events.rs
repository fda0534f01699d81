//! Lifecycle event bus
//!
//! Module lifecycle notifications (`loading`, `load`, `fail`, `unload`) are
//! published on a broadcast channel so the host can observe a batch without
//! the orchestrators holding subscriber lists.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

/// A single lifecycle notification.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub kind: EventKind,
}

#[derive(Debug, Clone)]
pub enum EventKind {
    /// A discovery batch has begun over these candidates.
    Loading { candidates: Vec<String> },
    /// A unit was loaded and registered.
    Load { name: String },
    /// A candidate failed verification dispatch or loading.
    Fail { name: String },
    /// A unit was removed from the registry.
    Unload { name: String },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. A send error only means nobody is listening.
    pub fn emit(&self, kind: EventKind) {
        let _ = self.tx.send(LifecycleEvent {
            id: Uuid::new_v4(),
            at: Utc::now(),
            kind,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_events_to_subscribers() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.emit(EventKind::Load {
            name: "joke".to_string(),
        });

        let event = rx.recv().await.expect("event should arrive");
        assert!(matches!(event.kind, EventKind::Load { ref name } if name == "joke"));
    }

    #[test]
    fn emit_without_subscribers_is_harmless() {
        let bus = EventBus::default();
        bus.emit(EventKind::Fail {
            name: "broken".to_string(),
        });
    }
}
