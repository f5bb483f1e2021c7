//! Streaming notification channel.
//!
//! One persistent connection, opened once at startup. Inbound frames are
//! JSON text carrying at least `detected_object`. A dropped connection is
//! terminal for the session: the channel emits a degraded-service event and
//! stops. It never reconnects on its own; resuming requires starting a new
//! channel.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{ChannelError, ChannelKind, ChannelState, Delivery};
use crate::bus::{EventBus, WatchEvent};
use crate::types::Notification;

/// A source of raw notification frames.
///
/// Production uses [`SseDetectionStream`]; tests inject scripted sources.
#[async_trait]
pub trait DetectionStream: Send {
    /// Open the connection. Called exactly once, before the first frame.
    async fn connect(&mut self) -> Result<(), ChannelError>;

    /// Pull the next frame. `None` means the connection ended.
    async fn next_frame(&mut self) -> Option<Result<String, ChannelError>>;
}

// ---------------------------------------------------------------------------
// Server-sent-events implementation
// ---------------------------------------------------------------------------

type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ChannelError>> + Send>>;

/// Detection stream over a long-lived HTTP response with `data:` framing.
pub struct SseDetectionStream {
    client: reqwest::Client,
    url: String,
    inner: Option<ChunkStream>,
    buffer: String,
    pending: VecDeque<String>,
}

impl SseDetectionStream {
    pub fn new(url: impl Into<String>) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            // Long timeout: the connection stays open between detections.
            .timeout(std::time::Duration::from_secs(300))
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| ChannelError::Connect(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            inner: None,
            buffer: String::new(),
            pending: VecDeque::new(),
        })
    }
}

#[async_trait]
impl DetectionStream for SseDetectionStream {
    async fn connect(&mut self) -> Result<(), ChannelError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChannelError::Connect(format!(
                "stream endpoint returned {}",
                response.status()
            )));
        }

        info!("connected to detection stream at {}", self.url);

        let stream = response.bytes_stream().map(|chunk| match chunk {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => Err(ChannelError::Stream(e.to_string())),
        });
        self.inner = Some(Box::pin(stream));

        Ok(())
    }

    async fn next_frame(&mut self) -> Option<Result<String, ChannelError>> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Some(Ok(frame));
            }

            let stream = self.inner.as_mut()?;
            match stream.next().await {
                Some(Ok(text)) => {
                    // Chunk boundaries are arbitrary; buffer until a blank
                    // line terminates an event.
                    self.buffer.push_str(&text.replace('\r', ""));
                    drain_events(&mut self.buffer, &mut self.pending);
                }
                Some(Err(e)) => return Some(Err(e)),
                None => return None,
            }
        }
    }
}

/// Split completed events off the front of the buffer and queue their
/// assembled `data:` payloads.
fn drain_events(buffer: &mut String, pending: &mut VecDeque<String>) {
    while let Some(idx) = buffer.find("\n\n") {
        let raw: String = buffer.drain(..idx + 2).collect();
        if let Some(data) = assemble_frame(&raw) {
            pending.push_back(data);
        }
    }
}

/// Collect the `data:` lines of one event. Events without data (comments,
/// heartbeats) yield nothing.
fn assemble_frame(raw: &str) -> Option<String> {
    let mut data = String::new();
    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            let chunk = rest.trim_start();
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(chunk);
        }
    }

    if data.is_empty() {
        None
    } else {
        Some(data)
    }
}

// ---------------------------------------------------------------------------
// Channel task
// ---------------------------------------------------------------------------

/// Handle to a running stream channel. Dropping the handle aborts the
/// listener task so no callback can fire after teardown.
pub struct StreamChannel {
    state: Arc<Mutex<ChannelState>>,
    handle: JoinHandle<()>,
}

impl StreamChannel {
    pub fn spawn(
        mut source: Box<dyn DetectionStream>,
        intake: mpsc::Sender<Delivery>,
        bus: Arc<EventBus>,
    ) -> Self {
        let state = Arc::new(Mutex::new(ChannelState::Uninitialized));
        let task_state = state.clone();

        let handle = tokio::spawn(async move {
            set_state(&task_state, ChannelState::Connecting);

            if let Err(e) = source.connect().await {
                warn!("stream channel failed to connect: {e}");
                set_state(&task_state, ChannelState::Terminated);
                bus.emit_watch(WatchEvent::ChannelDegraded {
                    channel: ChannelKind::Stream.as_str().to_string(),
                    reason: e.to_string(),
                });
                return;
            }

            set_state(&task_state, ChannelState::Active);
            bus.emit_watch(WatchEvent::ChannelActive {
                channel: ChannelKind::Stream.as_str().to_string(),
            });

            let reason = loop {
                match source.next_frame().await {
                    Some(Ok(frame)) => match serde_json::from_str::<Notification>(&frame) {
                        Ok(notification) => {
                            let delivery = Delivery {
                                notification,
                                channel: ChannelKind::Stream,
                            };
                            if intake.send(delivery).await.is_err() {
                                break "notifier intake closed".to_string();
                            }
                        }
                        Err(e) => warn!("discarding undecodable stream frame: {e}"),
                    },
                    Some(Err(e)) => break e.to_string(),
                    None => break "closed by server".to_string(),
                }
            };

            warn!("stream channel terminated: {reason}");
            set_state(&task_state, ChannelState::Terminated);
            bus.emit_watch(WatchEvent::ChannelDegraded {
                channel: ChannelKind::Stream.as_str().to_string(),
                reason,
            });
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

impl Drop for StreamChannel {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn set_state(state: &Mutex<ChannelState>, next: ChannelState) {
    *state.lock().unwrap_or_else(|e| e.into_inner()) = next;
}
