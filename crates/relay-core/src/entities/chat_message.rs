//! Chat message entity - a message as it was durably stored

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// A chat message after persistence.
///
/// The `id` and `created_at` are assigned by the store, never by the client;
/// this is the only form of a chat message that is ever broadcast to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Snowflake,
    pub room_id: Snowflake,
    pub sender_id: Snowflake,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Maximum accepted content length in characters
    pub const MAX_CONTENT_LENGTH: usize = 4000;

    pub fn new(
        id: Snowflake,
        room_id: Snowflake,
        sender_id: Snowflake,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            room_id,
            sender_id,
            content: content.into(),
            created_at,
        }
    }
}
