//! # relay-gateway
//!
//! Real-time delivery subsystem: a hub that multiplexes WebSocket
//! connections into chat-room broadcast and per-user notification push.
//!
//! - [`connection`]: one live transport, its bounded outbound queue and pumps
//! - [`registry`]: room and user indexes of live connections
//! - [`hub`]: the actor that owns the registry and routes every event
//! - [`liveness`]: ping/pong state machine per connection
//! - [`protocol`]: JSON wire format
//! - [`server`]: axum routes, admission, and start-up wiring

pub mod connection;
pub mod hub;
pub mod liveness;
pub mod protocol;
pub mod registry;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

pub use hub::{DeliveryServices, DeliveryServicesBuilder, Hub};
pub use server::{create_app, gateway_state_with_services, run, run_server, GatewayState};
