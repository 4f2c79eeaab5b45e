//! In-memory delivery collaborators
//!
//! Used when the gateway runs without `DATABASE_URL` and by tests. Nothing
//! here survives a restart.

mod chat_store;
mod notification_store;
mod room_directory;

pub use chat_store::InMemoryChatStore;
pub use notification_store::InMemoryNotificationStore;
pub use room_directory::InMemoryRoomDirectory;
