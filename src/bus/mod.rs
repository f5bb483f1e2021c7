//! Event system for presentation-layer updates.
//!
//! Everything user-visible (detection alerts, snapshot changes, degraded
//! channels, rejected commands) flows through one broadcast bus:
//! - `EventBus`: in-memory broadcast channel for immediate distribution
//! - `WatchEvent`: the typed events this client emits, each knowing its
//!   category and payload shape
//!
//! Renderers subscribe; nothing on the bus mutates client state.

mod event_bus;
mod watch_event;

pub use event_bus::{BusEvent, EventBus};
pub use watch_event::WatchEvent;
