//! PostgreSQL implementation of NotificationStore

use async_trait::async_trait;
use relay_core::{CollaboratorResult, DomainError, Notification, NotificationStore};
use sqlx::PgPool;
use tracing::instrument;

use super::error::map_db_error;

/// Stores notifications in `notifications`
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    #[instrument(skip(self, notification), fields(notification_id = %notification.id, user_id = %notification.user_id))]
    async fn persist_and_mark_deliverable(
        &self,
        notification: &Notification,
    ) -> CollaboratorResult<()> {
        let kind = serde_json::to_value(&notification.kind)
            .ok()
            .and_then(|v| v.as_str().map(ToString::to_string))
            .ok_or_else(|| DomainError::ValidationError("notification kind".to_string()))?;

        // Re-persisting an existing notification only re-arms delivery
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, data, created_at, deliverable)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            ON CONFLICT (id) DO UPDATE SET deliverable = TRUE
            "#,
        )
        .bind(notification.id.into_inner())
        .bind(notification.user_id.into_inner())
        .bind(kind)
        .bind(&notification.data)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}
