//! Watcher configuration.
//!
//! Configuration is an explicitly constructed value passed into the client;
//! nothing in the crate reads global state. The watcher binary loads it from
//! a JSON file under the data directory, falling back to defaults when the
//! file is absent.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the detection watcher client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Base origin of the detection service REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Endpoint of the live detection stream.
    #[serde(default = "default_stream_url")]
    pub stream_url: String,
    /// Request timeout for REST calls, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Suppress repeated notifications for the same detected object within
    /// this window, in milliseconds. `None` disables suppression and both
    /// delivery channels may alert independently.
    #[serde(default)]
    pub dedup_window_ms: Option<u64>,
    /// Whether to open the streaming channel at startup.
    #[serde(default = "default_true")]
    pub stream_enabled: bool,
    /// Whether to register the push-messaging channel at startup.
    #[serde(default = "default_true")]
    pub push_enabled: bool,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_stream_url() -> String {
    "http://localhost:5001/stream".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            stream_url: default_stream_url(),
            timeout_secs: default_timeout(),
            dedup_window_ms: None,
            stream_enabled: true,
            push_enabled: true,
        }
    }
}

impl WatchConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        for (name, url) in [("base_url", &self.base_url), ("stream_url", &self.stream_url)] {
            if url.trim().is_empty() {
                return Err(format!("{name} cannot be empty"));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("Invalid {name} scheme: {url}"));
            }
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Dedup window as a [`Duration`], if suppression is enabled.
    pub fn dedup_window(&self) -> Option<Duration> {
        self.dedup_window_ms.map(Duration::from_millis)
    }

    /// Load the configuration from the data directory.
    ///
    /// A missing file yields the defaults; a present but unparsable file is
    /// an error so a typo never silently reverts the watcher to defaults.
    pub async fn load() -> Result<Self, String> {
        let path = config_path();
        let Ok(raw) = tokio::fs::read_to_string(&path).await else {
            return Ok(Self::default());
        };

        serde_json::from_str(&raw)
            .map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))
    }
}

fn config_path() -> PathBuf {
    data_dir().join("watcher.json")
}

fn data_dir() -> PathBuf {
    if let Ok(path) = std::env::var("CRITTERWATCH_DATA_DIR") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".critterwatch");
    }

    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".critterwatch");
    }

    PathBuf::from(".critterwatch")
}
