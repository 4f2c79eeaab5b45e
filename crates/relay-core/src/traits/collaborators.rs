//! Delivery collaborators
//!
//! The delivery subsystem never touches storage or token verification
//! itself. These traits are the boundary it calls across; implementations
//! live in `relay-db` (storage) and `relay-common` (credentials).

use async_trait::async_trait;

use crate::entities::{ChatMessage, Notification};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for collaborator calls
pub type CollaboratorResult<T> = Result<T, DomainError>;

/// Resolves a bearer credential to a user ID before a connection is admitted
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate_credential(&self, token: &str) -> CollaboratorResult<Snowflake>;
}

/// Decides whether a user may take part in a room
#[async_trait]
pub trait RoomAuthorizer: Send + Sync {
    /// Called before admitting a chat connection and again for every inbound
    /// message, so revoked membership takes effect on the next message.
    async fn authorize_room_membership(
        &self,
        user_id: Snowflake,
        room_id: Snowflake,
    ) -> CollaboratorResult<()>;
}

/// Durable storage for chat messages
#[async_trait]
pub trait ChatMessageStore: Send + Sync {
    /// Store a message and return it with its server-assigned ID and timestamp
    async fn persist_chat_message(
        &self,
        room_id: Snowflake,
        sender_id: Snowflake,
        content: &str,
    ) -> CollaboratorResult<ChatMessage>;
}

/// Durable storage for notifications
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Store a notification so it can be pulled later even if no live
    /// connection receives it
    async fn persist_and_mark_deliverable(
        &self,
        notification: &Notification,
    ) -> CollaboratorResult<()>;
}
