//! Integration test utilities for the relay gateway
//!
//! Starts the full axum application on an ephemeral port over in-memory
//! collaborators and drives it with real WebSocket clients.

pub mod helpers;

pub use helpers::*;
