//! # relay-core
//!
//! Domain layer for the real-time delivery subsystem: identifiers, the shapes
//! that collaborators persist, and the collaborator traits the hub calls into.
//! This crate has no dependency on transport, database, or web framework code.

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{ChatMessage, Notification, NotificationKind};
pub use error::DomainError;
pub use traits::{
    ChatMessageStore, CollaboratorResult, CredentialValidator, NotificationStore, RoomAuthorizer,
};
pub use value_objects::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
