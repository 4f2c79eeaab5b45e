//! PostgreSQL implementation of ChatMessageStore

use async_trait::async_trait;
use relay_core::{ChatMessage, ChatMessageStore, CollaboratorResult, Snowflake, SnowflakeGenerator};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;

use super::error::map_db_error;
use super::models::ChatMessageModel;

/// Stores chat messages in `chat_messages`
#[derive(Clone)]
pub struct PgChatMessageStore {
    pool: PgPool,
    ids: Arc<SnowflakeGenerator>,
}

impl PgChatMessageStore {
    pub fn new(pool: PgPool, ids: Arc<SnowflakeGenerator>) -> Self {
        Self { pool, ids }
    }
}

#[async_trait]
impl ChatMessageStore for PgChatMessageStore {
    #[instrument(skip(self, content), fields(len = content.len()))]
    async fn persist_chat_message(
        &self,
        room_id: Snowflake,
        sender_id: Snowflake,
        content: &str,
    ) -> CollaboratorResult<ChatMessage> {
        let id = self.ids.generate();

        let row = sqlx::query_as::<_, ChatMessageModel>(
            r#"
            INSERT INTO chat_messages (id, room_id, sender_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, room_id, sender_id, content, created_at
            "#,
        )
        .bind(id.into_inner())
        .bind(room_id.into_inner())
        .bind(sender_id.into_inner())
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ChatMessage::from(row))
    }
}
