//! In-memory cache of server state.
//!
//! Each collection is an authoritative copy of the server's snapshot,
//! replaced wholesale on refresh; no incremental diffing, no client-side
//! merge logic. Overlapping refreshes are ordered by a monotonic ticket
//! drawn before the request is issued, so a late-arriving response for an
//! older request can never overwrite a newer snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::debug;

use crate::gateway::{Backend, GatewayError};
use crate::types::{DetectionEvent, StoreSnapshot};

#[derive(Debug)]
struct Slot<T> {
    items: Vec<T>,
    /// Ticket of the refresh that installed the current snapshot.
    ticket: u64,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            ticket: 0,
        }
    }
}

pub struct EventStore {
    events: RwLock<Slot<DetectionEvent>>,
    unknown: RwLock<Slot<DetectionEvent>>,
    unwanted: RwLock<Slot<String>>,
    next_ticket: AtomicU64,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Slot::default()),
            unknown: RwLock::new(Slot::default()),
            unwanted: RwLock::new(Slot::default()),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Draw the ticket for a refresh about to be issued. Tickets start at 1;
    /// 0 marks a never-refreshed slot.
    pub fn begin_refresh(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn apply<T>(slot: &RwLock<Slot<T>>, ticket: u64, items: Vec<T>) -> bool {
        let mut guard = slot.write().await;
        if ticket <= guard.ticket {
            debug!(
                "discarding stale snapshot (ticket {ticket} <= installed {})",
                guard.ticket
            );
            return false;
        }
        guard.items = items;
        guard.ticket = ticket;
        true
    }

    /// Install a fetched detection snapshot. Returns false when a newer
    /// refresh already landed and the response was discarded.
    pub async fn apply_events(&self, ticket: u64, items: Vec<DetectionEvent>) -> bool {
        Self::apply(&self.events, ticket, items).await
    }

    pub async fn apply_unknown(&self, ticket: u64, items: Vec<DetectionEvent>) -> bool {
        Self::apply(&self.unknown, ticket, items).await
    }

    pub async fn apply_unwanted(&self, ticket: u64, items: Vec<String>) -> bool {
        Self::apply(&self.unwanted, ticket, items).await
    }

    /// Refetch the detection collection through the gateway and install it,
    /// ticket permitting.
    pub async fn refresh_events(&self, backend: &dyn Backend) -> Result<bool, GatewayError> {
        let ticket = self.begin_refresh();
        let items = backend.list_events().await?;
        Ok(self.apply_events(ticket, items).await)
    }

    pub async fn refresh_unknown(&self, backend: &dyn Backend) -> Result<bool, GatewayError> {
        let ticket = self.begin_refresh();
        let items = backend.list_unknown().await?;
        Ok(self.apply_unknown(ticket, items).await)
    }

    pub async fn refresh_unwanted(&self, backend: &dyn Backend) -> Result<bool, GatewayError> {
        let ticket = self.begin_refresh();
        let items = backend.list_unwanted().await?;
        Ok(self.apply_unwanted(ticket, items).await)
    }

    pub async fn events(&self) -> Vec<DetectionEvent> {
        self.events.read().await.items.clone()
    }

    pub async fn unknown(&self) -> Vec<DetectionEvent> {
        self.unknown.read().await.items.clone()
    }

    pub async fn unwanted(&self) -> Vec<String> {
        self.unwanted.read().await.items.clone()
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            events: self.events().await,
            unknown: self.unknown().await,
            unwanted: self.unwanted().await,
        }
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: i64, object: &str) -> DetectionEvent {
        DetectionEvent {
            id,
            detected_object: object.to_string(),
            timestamp: "2025-03-01T04:12:00".to_string(),
            image_path: format!("captures/{object}_{id}.jpg"),
        }
    }

    #[tokio::test]
    async fn replaces_wholesale() {
        let store = EventStore::new();

        let t1 = store.begin_refresh();
        assert!(store.apply_events(t1, vec![event(1, "fox"), event(2, "deer")]).await);
        assert_eq!(store.events().await.len(), 2);

        let t2 = store.begin_refresh();
        assert!(store.apply_events(t2, vec![event(3, "raccoon")]).await);

        let events = store.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, 3);
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let store = EventStore::new();

        // Two refreshes issued back to back; the older response resolves last.
        let older = store.begin_refresh();
        let newer = store.begin_refresh();

        assert!(store.apply_events(newer, vec![event(2, "deer")]).await);
        assert!(!store.apply_events(older, vec![event(1, "fox")]).await);

        let events = store.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].detected_object, "deer");
    }

    #[tokio::test]
    async fn collections_do_not_interfere() {
        let store = EventStore::new();

        let t1 = store.begin_refresh();
        let t2 = store.begin_refresh();

        assert!(store.apply_unknown(t1, vec![event(9, "unknown")]).await);
        assert!(store.apply_unwanted(t2, vec!["raccoon".to_string()]).await);

        assert_eq!(store.unknown().await.len(), 1);
        assert_eq!(store.unwanted().await, vec!["raccoon".to_string()]);
        assert!(store.events().await.is_empty());
    }

    #[tokio::test]
    async fn snapshot_reflects_all_collections() {
        let store = EventStore::new();
        let t = store.begin_refresh();
        store.apply_events(t, vec![event(1, "fox")]).await;
        let t = store.begin_refresh();
        store.apply_unwanted(t, vec!["fox".to_string()]).await;

        let snap = store.snapshot().await;
        assert_eq!(snap.events.len(), 1);
        assert!(snap.unknown.is_empty());
        assert_eq!(snap.unwanted, vec!["fox".to_string()]);
    }
}
