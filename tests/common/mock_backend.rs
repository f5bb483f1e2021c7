// tests/common/mock_backend.rs
//! Scripted in-memory stand-in for the detection service.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use critterwatch::gateway::{Backend, GatewayError};
use critterwatch::types::DetectionEvent;

pub fn detection(id: i64, object: &str) -> DetectionEvent {
    DetectionEvent {
        id,
        detected_object: object.to_string(),
        timestamp: "2025-03-01T04:12:00".to_string(),
        image_path: format!("captures/{object}_{id}.jpg"),
    }
}

#[derive(Default)]
struct ServiceState {
    events: Vec<DetectionEvent>,
    unknown: Vec<DetectionEvent>,
    unwanted: Vec<String>,
    tokens: Vec<String>,
    labels: Vec<(i64, String)>,
}

/// Mock backend mirroring the service contract: unwanted entries are
/// deduplicated server-side, labeling removes the event from the unknown
/// set. Individual operations can be switched to fail.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<ServiceState>,
    failing: Mutex<HashSet<&'static str>>,
    list_events_calls: AtomicUsize,
    list_unknown_calls: AtomicUsize,
    list_unwanted_calls: AtomicUsize,
    submit_label_calls: AtomicUsize,
    add_unwanted_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_events(&self, events: Vec<DetectionEvent>) {
        self.state.lock().unwrap().events = events;
    }

    pub fn seed_unknown(&self, events: Vec<DetectionEvent>) {
        self.state.lock().unwrap().unknown = events;
    }

    /// Make the named operation fail with an injected 500 until cleared.
    pub fn set_failing(&self, operation: &'static str, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(operation);
        } else {
            set.remove(operation);
        }
    }

    pub fn list_events_calls(&self) -> usize {
        self.list_events_calls.load(Ordering::SeqCst)
    }

    pub fn list_unknown_calls(&self) -> usize {
        self.list_unknown_calls.load(Ordering::SeqCst)
    }

    pub fn list_unwanted_calls(&self) -> usize {
        self.list_unwanted_calls.load(Ordering::SeqCst)
    }

    pub fn submit_label_calls(&self) -> usize {
        self.submit_label_calls.load(Ordering::SeqCst)
    }

    pub fn add_unwanted_calls(&self) -> usize {
        self.add_unwanted_calls.load(Ordering::SeqCst)
    }

    pub fn submitted_labels(&self) -> Vec<(i64, String)> {
        self.state.lock().unwrap().labels.clone()
    }

    pub fn registered_tokens(&self) -> Vec<String> {
        self.state.lock().unwrap().tokens.clone()
    }

    fn check(&self, operation: &'static str) -> Result<(), GatewayError> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(GatewayError::Status {
                status: 500,
                body: format!("injected {operation} failure"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_events(&self) -> Result<Vec<DetectionEvent>, GatewayError> {
        self.list_events_calls.fetch_add(1, Ordering::SeqCst);
        self.check("list_events")?;
        Ok(self.state.lock().unwrap().events.clone())
    }

    async fn list_unknown(&self) -> Result<Vec<DetectionEvent>, GatewayError> {
        self.list_unknown_calls.fetch_add(1, Ordering::SeqCst);
        self.check("list_unknown")?;
        Ok(self.state.lock().unwrap().unknown.clone())
    }

    async fn list_unwanted(&self) -> Result<Vec<String>, GatewayError> {
        self.list_unwanted_calls.fetch_add(1, Ordering::SeqCst);
        self.check("list_unwanted")?;
        Ok(self.state.lock().unwrap().unwanted.clone())
    }

    async fn add_unwanted(&self, animal: &str) -> Result<(), GatewayError> {
        self.add_unwanted_calls.fetch_add(1, Ordering::SeqCst);
        self.check("add_unwanted")?;
        let mut state = self.state.lock().unwrap();
        // Server-side INSERT OR IGNORE semantics.
        if !state.unwanted.iter().any(|a| a == animal) {
            state.unwanted.push(animal.to_string());
        }
        Ok(())
    }

    async fn submit_label(&self, id: i64, label: &str) -> Result<(), GatewayError> {
        self.submit_label_calls.fetch_add(1, Ordering::SeqCst);
        self.check("submit_label")?;
        let mut state = self.state.lock().unwrap();
        state.labels.push((id, label.to_string()));
        state.unknown.retain(|event| event.id != id);
        Ok(())
    }

    async fn register_push_token(&self, token: &str) -> Result<(), GatewayError> {
        self.check("register_push_token")?;
        self.state.lock().unwrap().tokens.push(token.to_string());
        Ok(())
    }

    fn image_url(&self, image_path: &str) -> String {
        format!("http://mock/static/{image_path}")
    }

    async fn fetch_image(&self, image_path: &str) -> Result<Vec<u8>, GatewayError> {
        self.check("fetch_image")?;
        Ok(image_path.as_bytes().to_vec())
    }
}
