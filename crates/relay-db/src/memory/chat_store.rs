//! Chat messages held in process memory

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use relay_core::{
    ChatMessage, ChatMessageStore, CollaboratorResult, DomainError, Snowflake, SnowflakeGenerator,
};
use std::sync::atomic::{AtomicBool, Ordering};

/// Append-only message log
#[derive(Debug, Default)]
pub struct InMemoryChatStore {
    ids: SnowflakeGenerator,
    messages: RwLock<Vec<ChatMessage>>,
    unavailable: AtomicBool,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a storage outage; every persist fails while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Messages of one room, oldest first
    pub fn room_history(&self, room_id: Snowflake) -> Vec<ChatMessage> {
        self.messages
            .read()
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ChatMessageStore for InMemoryChatStore {
    async fn persist_chat_message(
        &self,
        room_id: Snowflake,
        sender_id: Snowflake,
        content: &str,
    ) -> CollaboratorResult<ChatMessage> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("chat store unavailable".to_string()));
        }

        let message = ChatMessage::new(self.ids.generate(), room_id, sender_id, content, Utc::now());
        self.messages.write().push(message.clone());
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_persist_assigns_increasing_ids() {
        let store = InMemoryChatStore::new();
        let room = Snowflake::new(7);
        let first = store
            .persist_chat_message(room, Snowflake::new(1), "hello")
            .await
            .unwrap();
        let second = store
            .persist_chat_message(room, Snowflake::new(2), "hi")
            .await
            .unwrap();

        assert!(second.id > first.id);
        assert_eq!(store.room_history(room), vec![first, second]);
        assert!(store.room_history(Snowflake::new(8)).is_empty());
    }

    #[tokio::test]
    async fn test_outage() {
        let store = InMemoryChatStore::new();
        store.set_unavailable(true);
        let err = store
            .persist_chat_message(Snowflake::new(7), Snowflake::new(1), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DatabaseError(_)));
        assert!(store.is_empty());
    }
}
