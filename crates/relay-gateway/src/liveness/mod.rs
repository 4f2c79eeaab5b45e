//! Connection liveness
//!
//! Ping/pong bookkeeping used by the writer pump to detect dead peers.

mod monitor;

pub use monitor::{LivenessMonitor, LivenessState};
