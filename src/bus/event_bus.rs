use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::watch_event::WatchEvent;

const BUS_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    pub id: String,
    pub seq: i64,
    pub category: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: String,
}

pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
    seq: AtomicI64,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            tx,
            seq: AtomicI64::new(0),
        }
    }

    /// Publish a pre-built event onto the bus.
    pub fn publish(&self, event: BusEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("event bus publish failed (no receivers?): {e}");
        }
    }

    /// Convenience: build and publish an event in one call.
    pub fn emit(
        &self,
        category: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> BusEvent {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let event = BusEvent {
            id: Uuid::new_v4().to_string(),
            seq,
            category: category.into(),
            event_type: event_type.into(),
            payload,
            created_at: Utc::now().to_rfc3339(),
        };
        self.publish(event.clone());
        event
    }

    /// Emit a typed client event.
    pub fn emit_watch(&self, event: WatchEvent) -> BusEvent {
        self.emit(event.category(), event.event_type(), event.to_payload())
    }

    /// Get a new receiver for this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emitted_events_reach_subscribers_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit("watch.store", "snapshot_refreshed", serde_json::json!({"count": 2}));
        bus.emit("watch.alert", "detection_alert", serde_json::json!({"detected_object": "fox"}));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.event_type, "snapshot_refreshed");
        assert_eq!(second.event_type, "detection_alert");
        assert!(first.seq < second.seq);
    }

    #[tokio::test]
    async fn typed_events_carry_their_payload() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit_watch(WatchEvent::DetectionAlert {
            detected_object: "fox".to_string(),
            channel: "stream".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.category, "watch.alert");
        assert_eq!(event.payload["detected_object"], "fox");
    }
}
