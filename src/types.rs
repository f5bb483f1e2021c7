//! Shared payload types for the detection service.

use serde::{Deserialize, Serialize};

/// A server-recorded animal sighting. Immutable once created server-side;
/// the client only ever holds a cached copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub id: i64,
    pub detected_object: String,
    pub timestamp: String,
    /// Path of the snapshot image, relative to the service's static root.
    pub image_path: String,
}

/// Transient "new detection" signal delivered over the stream and push
/// channels. Never persisted; extra payload fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub detected_object: String,
}

/// One consistent view of all three cached collections, for a single
/// render pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreSnapshot {
    pub events: Vec<DetectionEvent>,
    pub unknown: Vec<DetectionEvent>,
    pub unwanted: Vec<String>,
}
