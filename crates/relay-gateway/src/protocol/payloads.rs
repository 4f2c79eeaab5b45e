//! Gateway payload types

use serde::{Deserialize, Serialize};

/// Hello payload (op=10)
///
/// Sent by the server as the first frame on every admitted connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Connection ID assigned by the hub
    pub connection_id: String,
    /// Interval between server pings in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    #[must_use]
    pub fn new(connection_id: impl Into<String>, heartbeat_interval: u64) -> Self {
        Self {
            connection_id: connection_id.into(),
            heartbeat_interval,
        }
    }
}

/// Send Message payload (op=2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessagePayload {
    /// Message text
    pub content: String,
    /// Client-chosen correlation value, echoed back in a rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// Message Rejected payload (op=3)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRejectedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Machine-readable reason, e.g. `PERSISTENCE_FAILED`
    pub code: String,
    pub message: String,
}

impl MessageRejectedPayload {
    #[must_use]
    pub fn new(nonce: Option<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            nonce,
            code: code.into(),
            message: message.into(),
        }
    }
}
