//! Collaborators the hub calls into

use super::BuildError;
use relay_core::{ChatMessageStore, NotificationStore, RoomAuthorizer};
use std::sync::Arc;

/// Storage and authorization used while routing
#[derive(Clone)]
pub struct DeliveryServices {
    room_authorizer: Arc<dyn RoomAuthorizer>,
    chat_store: Arc<dyn ChatMessageStore>,
    notification_store: Arc<dyn NotificationStore>,
}

impl DeliveryServices {
    pub fn new(
        room_authorizer: Arc<dyn RoomAuthorizer>,
        chat_store: Arc<dyn ChatMessageStore>,
        notification_store: Arc<dyn NotificationStore>,
    ) -> Self {
        Self {
            room_authorizer,
            chat_store,
            notification_store,
        }
    }

    pub fn builder() -> DeliveryServicesBuilder {
        DeliveryServicesBuilder::default()
    }

    pub fn room_authorizer(&self) -> &dyn RoomAuthorizer {
        self.room_authorizer.as_ref()
    }

    pub fn chat_store(&self) -> &dyn ChatMessageStore {
        self.chat_store.as_ref()
    }

    pub fn notification_store(&self) -> &dyn NotificationStore {
        self.notification_store.as_ref()
    }
}

impl std::fmt::Debug for DeliveryServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryServices")
            .field("room_authorizer", &"dyn RoomAuthorizer")
            .field("chat_store", &"dyn ChatMessageStore")
            .field("notification_store", &"dyn NotificationStore")
            .finish()
    }
}

/// Builder for [`DeliveryServices`]
#[derive(Default)]
pub struct DeliveryServicesBuilder {
    room_authorizer: Option<Arc<dyn RoomAuthorizer>>,
    chat_store: Option<Arc<dyn ChatMessageStore>>,
    notification_store: Option<Arc<dyn NotificationStore>>,
}

impl DeliveryServicesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room_authorizer(mut self, authorizer: Arc<dyn RoomAuthorizer>) -> Self {
        self.room_authorizer = Some(authorizer);
        self
    }

    pub fn chat_store(mut self, store: Arc<dyn ChatMessageStore>) -> Self {
        self.chat_store = Some(store);
        self
    }

    pub fn notification_store(mut self, store: Arc<dyn NotificationStore>) -> Self {
        self.notification_store = Some(store);
        self
    }

    /// Build the services
    ///
    /// # Errors
    /// Returns `BuildError::Missing` if any collaborator was not set
    pub fn build(self) -> Result<DeliveryServices, BuildError> {
        Ok(DeliveryServices::new(
            self.room_authorizer
                .ok_or(BuildError::Missing("room_authorizer"))?,
            self.chat_store.ok_or(BuildError::Missing("chat_store"))?,
            self.notification_store
                .ok_or(BuildError::Missing("notification_store"))?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_db::{InMemoryChatStore, InMemoryNotificationStore, InMemoryRoomDirectory};

    #[test]
    fn test_builder_requires_every_collaborator() {
        let missing = DeliveryServices::builder()
            .room_authorizer(Arc::new(InMemoryRoomDirectory::new()))
            .chat_store(Arc::new(InMemoryChatStore::new()))
            .build();
        assert_eq!(
            missing.unwrap_err(),
            BuildError::Missing("notification_store")
        );

        let services = DeliveryServicesBuilder::new()
            .room_authorizer(Arc::new(InMemoryRoomDirectory::new()))
            .chat_store(Arc::new(InMemoryChatStore::new()))
            .notification_store(Arc::new(InMemoryNotificationStore::new()))
            .build();
        assert!(services.is_ok());
    }
}
