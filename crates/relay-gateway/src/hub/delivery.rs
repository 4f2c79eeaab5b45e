//! Events routed by the hub and what came of them

use crate::connection::ConnectionId;
use crate::protocol::GatewayMessage;
use relay_core::Snowflake;
use serde::Serialize;

/// Something to fan out
#[derive(Debug, Clone)]
pub enum OutboundEvent {
    /// Every room-scoped connection in `room_id`, minus `exclude`
    RoomBroadcast {
        room_id: Snowflake,
        payload: GatewayMessage,
        exclude: Option<ConnectionId>,
    },
    /// Every user-scoped connection of `user_id`
    DirectToUser {
        user_id: Snowflake,
        payload: GatewayMessage,
    },
}

/// Per-event delivery outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Queued on a live connection
    pub delivered: usize,
    /// Recipient's queue was full; it has been closed
    pub evicted: usize,
    /// Recipient was already closing
    pub skipped: usize,
}

impl DeliveryReport {
    pub fn recipients(&self) -> usize {
        self.delivered + self.evicted + self.skipped
    }
}

/// Registry counters, served by `/health`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connections: usize,
    pub room_connections: usize,
    pub user_connections: usize,
    pub rooms: usize,
    pub users: usize,
}
