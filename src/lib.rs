//! Client library for a remote animal-detection service.
//!
//! The service records animal sightings and reports them over REST plus two
//! independent push paths. This crate keeps a local cached view of that
//! state and turns both push paths into one normalized notification flow:
//! - `store`: in-memory snapshots, replaced wholesale with stale-response
//!   protection
//! - `gateway`: the REST seam (`Backend` trait + HTTP implementation)
//! - `notify`: the stream and push-messaging channels and the dedup policy
//! - `bus`: broadcast event bus feeding the presentation layer
//! - `client`: the facade wiring refreshes, commands, and alerts together
//! - `render`: a terminal renderer for the watcher binary

pub mod bus;
pub mod client;
pub mod config;
pub mod gateway;
pub mod notify;
pub mod render;
pub mod store;
pub mod types;

pub use bus::{BusEvent, EventBus, WatchEvent};
pub use client::WatchClient;
pub use config::WatchConfig;
pub use gateway::{Backend, GatewayError, HttpBackend};
pub use store::EventStore;
pub use types::{DetectionEvent, Notification, StoreSnapshot};
