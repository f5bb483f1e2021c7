//! Terminal presentation layer.
//!
//! Pure rendering: subscribes to the client bus, re-renders the store's
//! snapshot whenever a collection changes, and surfaces alerts and degraded
//! channels. Never mutates client state.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::bus::BusEvent;
use crate::gateway::Backend;
use crate::store::EventStore;

pub struct TerminalRenderer;

impl TerminalRenderer {
    /// Spawn a background task rendering bus events to stdout.
    pub fn start(
        store: Arc<EventStore>,
        backend: Arc<dyn Backend>,
        mut rx: broadcast::Receiver<BusEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => handle(&store, backend.as_ref(), &event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("renderer lagged, dropped {n} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

async fn handle(store: &EventStore, backend: &dyn Backend, event: &BusEvent) {
    match event.event_type.as_str() {
        "detection_alert" => {
            let object = event.payload["detected_object"].as_str().unwrap_or("?");
            let channel = event.payload["channel"].as_str().unwrap_or("?");
            println!("!! Alert: {object} detected ({channel})");
        }
        "snapshot_refreshed" => render(store, backend).await,
        "refresh_failed" => {
            let collection = event.payload["collection"].as_str().unwrap_or("?");
            let error = event.payload["error"].as_str().unwrap_or("?");
            println!("-- {collection} refresh failed: {error}");
        }
        "channel_degraded" => {
            let channel = event.payload["channel"].as_str().unwrap_or("?");
            let reason = event.payload["reason"].as_str().unwrap_or("?");
            println!("-- {channel} channel degraded: {reason}");
        }
        "command_rejected" => {
            let command = event.payload["command"].as_str().unwrap_or("?");
            let reason = event.payload["reason"].as_str().unwrap_or("?");
            println!("-- {command} rejected: {reason}");
        }
        _ => {}
    }
}

async fn render(store: &EventStore, backend: &dyn Backend) {
    let snap = store.snapshot().await;

    println!();
    println!("Detection events ({})", snap.events.len());
    for event in &snap.events {
        println!(
            "  #{} {} at {}  {}",
            event.id,
            event.detected_object,
            event.timestamp,
            backend.image_url(&event.image_path)
        );
    }

    println!("Unknown detections ({})", snap.unknown.len());
    for event in &snap.unknown {
        println!(
            "  #{} at {}  {}",
            event.id,
            event.timestamp,
            backend.image_url(&event.image_path)
        );
    }

    println!("Unwanted animals ({})", snap.unwanted.len());
    for animal in &snap.unwanted {
        println!("  {animal}");
    }
}
