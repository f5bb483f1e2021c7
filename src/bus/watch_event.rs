//! Typed events emitted by the watcher client.

use serde::{Deserialize, Serialize};

/// Events the client emits onto the bus during operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum WatchEvent {
    /// A new detection was delivered on one of the notification channels.
    DetectionAlert {
        detected_object: String,
        channel: String,
    },

    /// A cached collection was replaced with a fresh server snapshot.
    SnapshotRefreshed { collection: String, count: usize },

    /// A refresh attempt failed; the cached snapshot is unchanged.
    RefreshFailed { collection: String, error: String },

    /// A notification channel became active.
    ChannelActive { channel: String },

    /// A notification channel stopped delivering; service is degraded until
    /// a new channel is explicitly started.
    ChannelDegraded { channel: String, reason: String },

    /// A user command did not take effect, either rejected locally or
    /// failed at the backend.
    CommandRejected { command: String, reason: String },
}

impl WatchEvent {
    /// Get the event category for routing.
    pub fn category(&self) -> &'static str {
        match self {
            WatchEvent::DetectionAlert { .. } => "watch.alert",
            WatchEvent::SnapshotRefreshed { .. } | WatchEvent::RefreshFailed { .. } => {
                "watch.store"
            }
            WatchEvent::ChannelActive { .. } | WatchEvent::ChannelDegraded { .. } => {
                "watch.channel"
            }
            WatchEvent::CommandRejected { .. } => "watch.command",
        }
    }

    /// Get the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            WatchEvent::DetectionAlert { .. } => "detection_alert",
            WatchEvent::SnapshotRefreshed { .. } => "snapshot_refreshed",
            WatchEvent::RefreshFailed { .. } => "refresh_failed",
            WatchEvent::ChannelActive { .. } => "channel_active",
            WatchEvent::ChannelDegraded { .. } => "channel_degraded",
            WatchEvent::CommandRejected { .. } => "command_rejected",
        }
    }

    /// Convert to a JSON payload for the event bus.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}
