//! WebSocket close codes
//!
//! Sent in the close frame when the gateway ends a connection.

use serde::{Deserialize, Serialize};

/// Gateway WebSocket close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error occurred
    UnknownError = 4000,
    /// Client sent a server-only or undefined opcode
    UnknownOpcode = 4001,
    /// Payload was not valid JSON / not a text frame
    DecodeError = 4002,
    /// Room membership no longer authorized
    NotAuthorized = 4003,
    /// Outbound queue overflowed
    SlowConsumer = 4008,
    /// No pong within the configured timeout
    HeartbeatTimeout = 4009,
    /// Removed by an administrative action
    Dismissed = 4010,
    /// Gateway is shutting down
    ServerShutdown = 4011,
    /// Room already holds the maximum number of connections
    RoomFull = 4012,
}

impl CloseCode {
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::UnknownOpcode),
            4002 => Some(Self::DecodeError),
            4003 => Some(Self::NotAuthorized),
            4008 => Some(Self::SlowConsumer),
            4009 => Some(Self::HeartbeatTimeout),
            4010 => Some(Self::Dismissed),
            4011 => Some(Self::ServerShutdown),
            4012 => Some(Self::RoomFull),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Check if the client should attempt to reconnect after this close code
    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        matches!(
            self,
            Self::UnknownError | Self::SlowConsumer | Self::HeartbeatTimeout | Self::ServerShutdown
        )
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error occurred",
            Self::UnknownOpcode => "Invalid opcode sent",
            Self::DecodeError => "Invalid payload encoding",
            Self::NotAuthorized => "Not authorized for this room",
            Self::SlowConsumer => "Outbound queue overflow",
            Self::HeartbeatTimeout => "Heartbeat timeout",
            Self::Dismissed => "Connection dismissed",
            Self::ServerShutdown => "Server shutting down",
            Self::RoomFull => "Room is full",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnknownError => "UnknownError",
            Self::UnknownOpcode => "UnknownOpcode",
            Self::DecodeError => "DecodeError",
            Self::NotAuthorized => "NotAuthorized",
            Self::SlowConsumer => "SlowConsumer",
            Self::HeartbeatTimeout => "HeartbeatTimeout",
            Self::Dismissed => "Dismissed",
            Self::ServerShutdown => "ServerShutdown",
            Self::RoomFull => "RoomFull",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
