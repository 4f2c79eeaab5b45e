//! Collaborator traits (ports) implemented outside the delivery subsystem

mod collaborators;

pub use collaborators::{
    ChatMessageStore, CollaboratorResult, CredentialValidator, NotificationStore, RoomAuthorizer,
};
