// tests/common/mod.rs
//! Shared test doubles for integration testing.

pub mod mock_backend;
pub mod mock_stream;

pub use mock_backend::{detection, MockBackend};
pub use mock_stream::{PipedStream, ScriptedStream};
