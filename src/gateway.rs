//! Backend gateway for the detection service REST API.
//!
//! The [`Backend`] trait is the seam between the client and the remote
//! service: production code talks to [`HttpBackend`], tests inject a
//! scripted implementation. Read operations are idempotent; mutations get
//! exactly one attempt each; there is no retry policy at this layer.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::types::DetectionEvent;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    Decode(String),
}

/// Operations the detection service exposes to this client.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_events(&self) -> Result<Vec<DetectionEvent>, GatewayError>;

    async fn list_unknown(&self) -> Result<Vec<DetectionEvent>, GatewayError>;

    async fn list_unwanted(&self) -> Result<Vec<String>, GatewayError>;

    /// Flag an animal label as unwanted. The service deduplicates entries;
    /// the client never assumes more than that.
    async fn add_unwanted(&self, animal: &str) -> Result<(), GatewayError>;

    /// Assign a human-provided label to an unknown detection.
    async fn submit_label(&self, id: i64, label: &str) -> Result<(), GatewayError>;

    /// Upload an opaque push delivery token so the service can address this
    /// client through its push fanout.
    async fn register_push_token(&self, token: &str) -> Result<(), GatewayError>;

    /// Absolute URL of a detection snapshot image.
    fn image_url(&self, image_path: &str) -> String;

    /// Fetch a detection snapshot image.
    async fn fetch_image(&self, image_path: &str) -> Result<Vec<u8>, GatewayError>;
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// The service serves event rows either as JSON objects or as positional
/// arrays (raw database rows: id, timestamp, object, image path). Accept
/// both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventRow {
    Object {
        id: i64,
        detected_object: String,
        timestamp: String,
        image_path: String,
    },
    Positional(i64, String, String, String),
}

impl From<EventRow> for DetectionEvent {
    fn from(row: EventRow) -> Self {
        match row {
            EventRow::Object {
                id,
                detected_object,
                timestamp,
                image_path,
            } => DetectionEvent {
                id,
                detected_object,
                timestamp,
                image_path,
            },
            EventRow::Positional(id, timestamp, detected_object, image_path) => DetectionEvent {
                id,
                detected_object,
                timestamp,
                image_path,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct UnwantedResponse {
    unwanted: Vec<String>,
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// REST gateway over a single shared [`reqwest::Client`].
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Request(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let url = self.endpoint(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        debug!("GET {path}: status={status}");

        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| GatewayError::Decode(format!("{path}: {e}")))
    }

    /// POST a JSON body. The service's mutation responses carry nothing this
    /// client consumes, so only the status is inspected.
    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<(), GatewayError> {
        let url = self.endpoint(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();
        debug!("POST {path}: status={status}");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_events(&self) -> Result<Vec<DetectionEvent>, GatewayError> {
        let rows: Vec<EventRow> = self.get_json("/events").await?;
        Ok(rows.into_iter().map(DetectionEvent::from).collect())
    }

    async fn list_unknown(&self) -> Result<Vec<DetectionEvent>, GatewayError> {
        let rows: Vec<EventRow> = self.get_json("/unknown").await?;
        Ok(rows.into_iter().map(DetectionEvent::from).collect())
    }

    async fn list_unwanted(&self) -> Result<Vec<String>, GatewayError> {
        let body: UnwantedResponse = self.get_json("/unwanted").await?;
        Ok(body.unwanted)
    }

    async fn add_unwanted(&self, animal: &str) -> Result<(), GatewayError> {
        self.post_json("/unwanted", &serde_json::json!({ "animal": animal }))
            .await
    }

    async fn submit_label(&self, id: i64, label: &str) -> Result<(), GatewayError> {
        self.post_json("/identify", &serde_json::json!({ "id": id, "label": label }))
            .await
    }

    async fn register_push_token(&self, token: &str) -> Result<(), GatewayError> {
        self.post_json("/register-token", &serde_json::json!({ "token": token }))
            .await
    }

    fn image_url(&self, image_path: &str) -> String {
        format!(
            "{}/static/{}",
            self.base_url,
            image_path.trim_start_matches('/')
        )
    }

    async fn fetch_image(&self, image_path: &str) -> Result<Vec<u8>, GatewayError> {
        let url = self.image_url(image_path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
