//! Row types

use chrono::{DateTime, Utc};
use relay_core::{ChatMessage, Snowflake};
use sqlx::FromRow;

/// Row of `chat_messages`
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ChatMessageModel {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessageModel> for ChatMessage {
    fn from(model: ChatMessageModel) -> Self {
        ChatMessage::new(
            Snowflake::new(model.id),
            Snowflake::new(model.room_id),
            Snowflake::new(model.sender_id),
            model.content,
            model.created_at,
        )
    }
}

/// Result of the room membership lookup
#[derive(Debug, Clone, Copy, FromRow)]
pub(crate) struct RoomMembershipRow {
    pub is_member: bool,
}
