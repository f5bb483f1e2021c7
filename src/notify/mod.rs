//! Realtime notifier: two delivery channels, one normalized intake.
//!
//! The detection service pushes "new detection" signals over two independent
//! paths: a persistent stream connection and a platform push-messaging
//! service. Both channels decode inbound payloads into a [`Notification`]
//! and publish it to a single mpsc intake; one consumer (in the client)
//! applies the dedup policy, raises the alert, and triggers the refresh.
//! The channels themselves never touch cached state.

pub mod push;
pub mod stream;

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::types::Notification;

/// Capacity of the normalized notification intake.
pub(crate) const INTAKE_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("stream error: {0}")]
    Stream(String),
    #[error("channel closed")]
    Closed,
}

/// Lifecycle of a notification channel.
///
/// The stream channel never leaves `Terminated`: a dropped connection is
/// terminal for the session. The push channel only reaches `Terminated`
/// when its feed is torn down or registration fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Uninitialized,
    Connecting,
    Active,
    Terminated,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Uninitialized => write!(f, "uninitialized"),
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Active => write!(f, "active"),
            ChannelState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Which source delivered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Stream,
    Push,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Stream => "stream",
            ChannelKind::Push => "push",
        }
    }
}

/// A normalized notification together with the channel that delivered it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub notification: Notification,
    pub channel: ChannelKind,
}

/// Suppresses repeat deliveries of the same detected object within a
/// configurable window. With no window configured every delivery is
/// admitted, so both channels may alert for one underlying detection.
/// That redundancy is kept harmless by the idempotent wholesale replace
/// in the store.
pub struct DedupPolicy {
    window: Option<Duration>,
    recent: HashMap<String, Instant>,
}

impl DedupPolicy {
    pub fn new(window: Option<Duration>) -> Self {
        Self {
            window,
            recent: HashMap::new(),
        }
    }

    /// Returns true when the notification should be delivered.
    pub fn admit(&mut self, detected_object: &str, now: Instant) -> bool {
        let Some(window) = self.window else {
            return true;
        };

        self.recent
            .retain(|_, seen| now.duration_since(*seen) < window);

        if self.recent.contains_key(detected_object) {
            return false;
        }
        self.recent.insert(detected_object.to_string(), now);
        true
    }
}
