//! The watcher client: one explicitly constructed context tying the cached
//! store, the backend gateway, the notification channels, and the event bus
//! together.
//!
//! All state mutation routes through here: notifications trigger a refresh,
//! user commands go gateway-first and then refresh the affected collection.
//! Presentation code only ever reads snapshots and subscribes to the bus.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::bus::{BusEvent, EventBus, WatchEvent};
use crate::config::WatchConfig;
use crate::gateway::{Backend, GatewayError};
use crate::notify::push::{PushChannel, PushMessaging};
use crate::notify::stream::{DetectionStream, StreamChannel};
use crate::notify::{DedupPolicy, Delivery, INTAKE_CAPACITY};
use crate::store::EventStore;

#[derive(Debug, Clone, Copy)]
enum Collection {
    Events,
    Unknown,
    Unwanted,
}

impl Collection {
    fn name(&self) -> &'static str {
        match self {
            Collection::Events => "events",
            Collection::Unknown => "unknown",
            Collection::Unwanted => "unwanted",
        }
    }
}

pub struct WatchClient {
    config: WatchConfig,
    backend: Arc<dyn Backend>,
    store: Arc<EventStore>,
    bus: Arc<EventBus>,
    intake: mpsc::Sender<Delivery>,
}

impl WatchClient {
    /// Build a client and start its notifier consumer.
    ///
    /// Must be called from within a tokio runtime. The consumer exits once
    /// the client and every channel handle have been dropped.
    pub fn new(config: WatchConfig, backend: Arc<dyn Backend>) -> Self {
        let store = Arc::new(EventStore::new());
        let bus = Arc::new(EventBus::new());
        let (intake, intake_rx) = mpsc::channel(INTAKE_CAPACITY);

        tokio::spawn(consume(
            intake_rx,
            DedupPolicy::new(config.dedup_window()),
            backend.clone(),
            store.clone(),
            bus.clone(),
        ));

        Self {
            config,
            backend,
            store,
            bus,
            intake,
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<EventStore> {
        self.store.clone()
    }

    pub fn bus(&self) -> Arc<EventBus> {
        self.bus.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.bus.subscribe()
    }

    /// Open the streaming channel on the given source.
    pub fn start_stream(&self, source: Box<dyn DetectionStream>) -> StreamChannel {
        StreamChannel::spawn(source, self.intake.clone(), self.bus.clone())
    }

    /// Register and start the push-messaging channel on the given source.
    pub fn start_push(&self, source: Box<dyn PushMessaging>) -> PushChannel {
        PushChannel::spawn(
            source,
            self.backend.clone(),
            self.intake.clone(),
            self.bus.clone(),
        )
    }

    pub async fn refresh_events(&self) -> Result<bool, GatewayError> {
        refresh(Collection::Events, self.backend.as_ref(), &self.store, &self.bus).await
    }

    pub async fn refresh_unknown(&self) -> Result<bool, GatewayError> {
        refresh(Collection::Unknown, self.backend.as_ref(), &self.store, &self.bus).await
    }

    pub async fn refresh_unwanted(&self) -> Result<bool, GatewayError> {
        refresh(Collection::Unwanted, self.backend.as_ref(), &self.store, &self.bus).await
    }

    /// Refresh all three collections. A failing collection is reported on
    /// the bus and never blocks its siblings.
    pub async fn refresh_all(&self) {
        let _ = futures::join!(
            self.refresh_events(),
            self.refresh_unknown(),
            self.refresh_unwanted(),
        );
    }

    /// Assign a label to an unknown detection, then refresh the unknown
    /// collection. An empty label is a no-op: no request is sent and no
    /// refresh is triggered. Returns whether a label was submitted.
    pub async fn submit_label(&self, id: i64, label: &str) -> Result<bool, GatewayError> {
        if label.is_empty() {
            debug!("ignoring empty label for detection {id}");
            self.bus.emit_watch(WatchEvent::CommandRejected {
                command: "submit_label".to_string(),
                reason: "empty label".to_string(),
            });
            return Ok(false);
        }

        if let Err(e) = self.backend.submit_label(id, label).await {
            warn!("label submission for detection {id} failed: {e}");
            self.bus.emit_watch(WatchEvent::CommandRejected {
                command: "submit_label".to_string(),
                reason: e.to_string(),
            });
            return Err(e);
        }

        self.refresh_unknown().await?;
        Ok(true)
    }

    /// Flag an animal as unwanted, then refresh the unwanted collection.
    pub async fn add_unwanted(&self, animal: &str) -> Result<(), GatewayError> {
        if let Err(e) = self.backend.add_unwanted(animal).await {
            warn!("flagging {animal} as unwanted failed: {e}");
            self.bus.emit_watch(WatchEvent::CommandRejected {
                command: "add_unwanted".to_string(),
                reason: e.to_string(),
            });
            return Err(e);
        }

        self.refresh_unwanted().await?;
        Ok(())
    }
}

async fn refresh(
    collection: Collection,
    backend: &dyn Backend,
    store: &EventStore,
    bus: &EventBus,
) -> Result<bool, GatewayError> {
    let result = match collection {
        Collection::Events => store.refresh_events(backend).await,
        Collection::Unknown => store.refresh_unknown(backend).await,
        Collection::Unwanted => store.refresh_unwanted(backend).await,
    };

    match result {
        Ok(applied) => {
            if applied {
                let count = match collection {
                    Collection::Events => store.events().await.len(),
                    Collection::Unknown => store.unknown().await.len(),
                    Collection::Unwanted => store.unwanted().await.len(),
                };
                bus.emit_watch(WatchEvent::SnapshotRefreshed {
                    collection: collection.name().to_string(),
                    count,
                });
            }
            Ok(applied)
        }
        Err(e) => {
            warn!("{} refresh failed: {e}", collection.name());
            bus.emit_watch(WatchEvent::RefreshFailed {
                collection: collection.name().to_string(),
                error: e.to_string(),
            });
            Err(e)
        }
    }
}

/// Single consumer of the normalized notification intake: dedup, alert,
/// refresh. Runs until every intake sender is gone.
async fn consume(
    mut rx: mpsc::Receiver<Delivery>,
    mut dedup: DedupPolicy,
    backend: Arc<dyn Backend>,
    store: Arc<EventStore>,
    bus: Arc<EventBus>,
) {
    while let Some(delivery) = rx.recv().await {
        let object = delivery.notification.detected_object;
        if !dedup.admit(&object, Instant::now()) {
            debug!("suppressing duplicate notification for {object}");
            continue;
        }

        info!("{object} detected (via {})", delivery.channel.as_str());
        bus.emit_watch(WatchEvent::DetectionAlert {
            detected_object: object,
            channel: delivery.channel.as_str().to_string(),
        });

        // A failed refresh is already surfaced on the bus; keep consuming.
        let _ = refresh(Collection::Events, backend.as_ref(), &store, &bus).await;
    }

    debug!("notifier intake closed");
}
