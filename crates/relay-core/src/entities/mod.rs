//! Domain entities - the shapes persisted by delivery collaborators

mod chat_message;
mod notification;

pub use chat_message::ChatMessage;
pub use notification::{Notification, NotificationKind};
