//! Hub error types

use crate::connection::{CloseReason, ConnectionId};
use crate::protocol::CloseCode;
use relay_core::{DomainError, Snowflake};

/// The hub actor is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    #[error("hub is not running")]
    Closed,
}

/// Why a connection was not admitted
#[derive(Debug, thiserror::Error)]
pub enum AdmitError {
    #[error("room {room_id} is full ({max} connections)")]
    RoomFull { room_id: Snowflake, max: usize },

    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    #[error("connection {0} is not active")]
    NotActive(ConnectionId),

    #[error(transparent)]
    Hub(#[from] HubError),
}

impl AdmitError {
    /// Close code sent to the peer that was turned away
    pub fn close_code(&self) -> CloseCode {
        match self {
            Self::RoomFull { .. } => CloseCode::RoomFull,
            Self::Hub(_) => CloseCode::ServerShutdown,
            Self::AlreadyRegistered(_) | Self::NotActive(_) => CloseCode::UnknownError,
        }
    }
}

/// Why an inbound chat message was not broadcast
#[derive(Debug, thiserror::Error)]
pub enum InboundError {
    #[error("connection {0} is not registered")]
    NotRegistered(ConnectionId),

    #[error("only room connections can send messages")]
    NotRoomScoped,

    #[error("message content is empty")]
    EmptyContent,

    #[error("message content exceeds {max} characters")]
    ContentTooLong { max: usize },

    #[error("not authorized for this room: {0}")]
    Unauthorized(#[source] DomainError),

    #[error("room authorization unavailable: {0}")]
    AuthorizationUnavailable(#[source] DomainError),

    #[error("message could not be stored: {0}")]
    Persistence(#[source] DomainError),

    #[error("message could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Hub(#[from] HubError),
}

impl InboundError {
    /// Code carried in the rejection sent back to the sender
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotRegistered(_) => "NOT_REGISTERED",
            Self::NotRoomScoped => "NOT_ROOM_SCOPED",
            Self::EmptyContent => "EMPTY_CONTENT",
            Self::ContentTooLong { .. } => "CONTENT_TOO_LONG",
            Self::Unauthorized(_) => "NOT_AUTHORIZED",
            Self::AuthorizationUnavailable(_) => "AUTHORIZATION_UNAVAILABLE",
            Self::Persistence(_) => "PERSISTENCE_FAILED",
            Self::Encode(_) => "INTERNAL_ERROR",
            Self::Hub(_) => "HUB_UNAVAILABLE",
        }
    }

    /// Reason to close the sender's connection, if the error is fatal to it
    pub fn close_reason(&self) -> Option<CloseReason> {
        match self {
            Self::Unauthorized(_) => Some(CloseReason::MembershipRevoked),
            Self::NotRegistered(_) => Some(CloseReason::Dismissed),
            Self::Hub(_) => Some(CloseReason::ServerShutdown),
            _ => None,
        }
    }
}

/// Why a notification was not pushed
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification could not be stored: {0}")]
    Persistence(#[source] DomainError),

    #[error("notification could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Hub(#[from] HubError),
}

/// Missing collaborator when building [`DeliveryServices`](super::DeliveryServices)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("{0} is required")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_close_codes() {
        let full = AdmitError::RoomFull {
            room_id: Snowflake::new(7),
            max: 2,
        };
        assert_eq!(full.close_code(), CloseCode::RoomFull);
        assert_eq!(
            AdmitError::from(HubError::Closed).close_code(),
            CloseCode::ServerShutdown
        );
    }

    #[test]
    fn test_inbound_errors_fatal_or_not() {
        let revoked = InboundError::Unauthorized(DomainError::NotRoomMember {
            user_id: Snowflake::new(1),
            room_id: Snowflake::new(7),
        });
        assert_eq!(revoked.code(), "NOT_AUTHORIZED");
        assert_eq!(revoked.close_reason(), Some(CloseReason::MembershipRevoked));

        let store = InboundError::Persistence(DomainError::DatabaseError("down".into()));
        assert_eq!(store.code(), "PERSISTENCE_FAILED");
        assert!(store.close_reason().is_none());

        assert!(InboundError::EmptyContent.close_reason().is_none());
        assert!(InboundError::NotRoomScoped.close_reason().is_none());
    }
}
