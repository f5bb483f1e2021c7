//! Push-messaging notification channel.
//!
//! Registration yields an opaque delivery token which is uploaded to the
//! backend so the service can address this client through its push fanout;
//! afterwards the channel passively listens for inbound payloads. Payload
//! handling is identical to the stream channel's. The actual push-service
//! SDK lives outside this crate; platform glue feeds payloads in through
//! a [`PushInjector`].

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ChannelError, ChannelKind, ChannelState, Delivery, INTAKE_CAPACITY};
use crate::bus::{EventBus, WatchEvent};
use crate::gateway::Backend;
use crate::types::Notification;

/// Result of registering with the push-messaging service.
#[derive(Debug, Clone)]
pub struct PushRegistration {
    /// Opaque delivery token. Only ever forwarded to the backend.
    pub token: String,
}

/// A push-messaging source: one registration step, then a passive listener.
#[async_trait]
pub trait PushMessaging: Send {
    async fn register(&mut self) -> Result<PushRegistration, ChannelError>;

    /// Wait for the next inbound push payload. `None` means the feed was
    /// torn down.
    async fn next_message(&mut self) -> Option<String>;
}

// ---------------------------------------------------------------------------
// In-process feed
// ---------------------------------------------------------------------------

/// In-process push feed. The platform side holds the [`PushInjector`] and
/// delivers raw payloads into it; the channel consumes them like stream
/// frames.
pub struct ChannelPushFeed {
    token: String,
    rx: mpsc::Receiver<String>,
}

/// Delivery handle for platform glue.
#[derive(Clone)]
pub struct PushInjector {
    tx: mpsc::Sender<String>,
}

impl ChannelPushFeed {
    pub fn new() -> (Self, PushInjector) {
        let (tx, rx) = mpsc::channel(INTAKE_CAPACITY);
        let feed = Self {
            token: Uuid::new_v4().to_string(),
            rx,
        };
        (feed, PushInjector { tx })
    }
}

#[async_trait]
impl PushMessaging for ChannelPushFeed {
    async fn register(&mut self) -> Result<PushRegistration, ChannelError> {
        Ok(PushRegistration {
            token: self.token.clone(),
        })
    }

    async fn next_message(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

impl PushInjector {
    pub async fn deliver(&self, payload: impl Into<String>) -> Result<(), ChannelError> {
        self.tx
            .send(payload.into())
            .await
            .map_err(|_| ChannelError::Closed)
    }
}

// ---------------------------------------------------------------------------
// Channel task
// ---------------------------------------------------------------------------

/// Handle to a running push channel. Dropping the handle aborts the
/// listener task.
pub struct PushChannel {
    state: Arc<Mutex<ChannelState>>,
    handle: JoinHandle<()>,
}

impl PushChannel {
    pub fn spawn(
        mut source: Box<dyn PushMessaging>,
        backend: Arc<dyn Backend>,
        intake: mpsc::Sender<Delivery>,
        bus: Arc<EventBus>,
    ) -> Self {
        let state = Arc::new(Mutex::new(ChannelState::Uninitialized));
        let task_state = state.clone();

        let handle = tokio::spawn(async move {
            set_state(&task_state, ChannelState::Connecting);

            let registration = match source.register().await {
                Ok(r) => r,
                Err(e) => {
                    warn!("push registration failed: {e}");
                    set_state(&task_state, ChannelState::Terminated);
                    bus.emit_watch(WatchEvent::ChannelDegraded {
                        channel: ChannelKind::Push.as_str().to_string(),
                        reason: e.to_string(),
                    });
                    return;
                }
            };

            if let Err(e) = backend.register_push_token(&registration.token).await {
                warn!("push token upload failed: {e}");
                set_state(&task_state, ChannelState::Terminated);
                bus.emit_watch(WatchEvent::ChannelDegraded {
                    channel: ChannelKind::Push.as_str().to_string(),
                    reason: e.to_string(),
                });
                return;
            }

            set_state(&task_state, ChannelState::Active);
            bus.emit_watch(WatchEvent::ChannelActive {
                channel: ChannelKind::Push.as_str().to_string(),
            });
            debug!("push channel registered and listening");

            while let Some(payload) = source.next_message().await {
                match serde_json::from_str::<Notification>(&payload) {
                    Ok(notification) => {
                        let delivery = Delivery {
                            notification,
                            channel: ChannelKind::Push,
                        };
                        if intake.send(delivery).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("discarding undecodable push payload: {e}"),
                }
            }

            // Feed lives for the page lifetime; reaching here is teardown.
            debug!("push channel feed ended");
            set_state(&task_state, ChannelState::Terminated);
        });

        Self { state, handle }
    }

    pub fn state(&self) -> ChannelState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn set_state(state: &Mutex<ChannelState>, next: ChannelState) {
    *state.lock().unwrap_or_else(|e| e.into_inner()) = next;
}
