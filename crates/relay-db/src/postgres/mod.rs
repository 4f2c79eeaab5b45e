//! PostgreSQL implementations of the delivery collaborators

mod chat_message;
mod error;
mod models;
mod notification;
mod room;

pub use chat_message::PgChatMessageStore;
pub use notification::PgNotificationStore;
pub use room::PgRoomAuthorizer;
