//! Dispatch event names

use serde::{Deserialize, Serialize};

/// Event type carried in the `t` field of a Dispatch (op=0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchEvent {
    /// A chat message was stored in the connection's room
    MessageCreate,
    /// A notification was stored for the connected user
    NotificationCreate,
}

impl DispatchEvent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::NotificationCreate => "NOTIFICATION_CREATE",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MESSAGE_CREATE" => Some(Self::MessageCreate),
            "NOTIFICATION_CREATE" => Some(Self::NotificationCreate),
            _ => None,
        }
    }
}

impl std::fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
