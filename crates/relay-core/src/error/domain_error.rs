//! Domain errors - failures reported by delivery collaborators

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Errors returned by the collaborator traits
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Credential Errors
    // =========================================================================
    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Credential expired")]
    CredentialExpired,

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("User {user_id} is not a member of room {room_id}")]
    NotRoomMember { user_id: Snowflake, room_id: Snowflake },

    #[error("Room not found: {0}")]
    RoomNotFound(Snowflake),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Content too long: max {max} characters")]
    ContentTooLong { max: usize },

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for wire responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::CredentialExpired => "CREDENTIAL_EXPIRED",
            Self::NotRoomMember { .. } => "NOT_ROOM_MEMBER",
            Self::RoomNotFound(_) => "UNKNOWN_ROOM",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::ContentTooLong { .. } => "CONTENT_TOO_LONG",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a credential error
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::InvalidCredential | Self::CredentialExpired)
    }

    /// Check if this is an authorization error
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::NotRoomMember { .. } | Self::RoomNotFound(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_) | Self::ContentTooLong { .. })
    }
}
