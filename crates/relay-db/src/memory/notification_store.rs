//! Notifications held in process memory

use async_trait::async_trait;
use dashmap::DashMap;
use relay_core::{CollaboratorResult, DomainError, Notification, NotificationStore, Snowflake};
use std::sync::atomic::{AtomicBool, Ordering};

/// User → notifications awaiting a pull
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    by_user: DashMap<Snowflake, Vec<Notification>>,
    unavailable: AtomicBool,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a storage outage; every persist fails while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Everything stored for a user, oldest first
    pub fn deliverable_for(&self, user_id: Snowflake) -> Vec<Notification> {
        self.by_user
            .get(&user_id)
            .map(|list| list.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn persist_and_mark_deliverable(
        &self,
        notification: &Notification,
    ) -> CollaboratorResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError(
                "notification store unavailable".to_string(),
            ));
        }

        let mut list = self.by_user.entry(notification.user_id).or_default();
        if !list.iter().any(|n| n.id == notification.id) {
            list.push(notification.clone());
        }
        Ok(())
    }
}
