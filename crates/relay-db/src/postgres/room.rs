//! PostgreSQL implementation of RoomAuthorizer

use async_trait::async_trait;
use relay_core::{CollaboratorResult, DomainError, RoomAuthorizer, Snowflake};
use sqlx::PgPool;
use tracing::instrument;

use super::error::map_db_error;
use super::models::RoomMembershipRow;

/// Authorizes room access against `chat_room_participants`
#[derive(Clone)]
pub struct PgRoomAuthorizer {
    pool: PgPool,
}

impl PgRoomAuthorizer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomAuthorizer for PgRoomAuthorizer {
    #[instrument(skip(self))]
    async fn authorize_room_membership(
        &self,
        user_id: Snowflake,
        room_id: Snowflake,
    ) -> CollaboratorResult<()> {
        // A closed room behaves like a missing one
        let row = sqlx::query_as::<_, RoomMembershipRow>(
            r#"
            SELECT p.user_id IS NOT NULL AS is_member
            FROM chat_rooms r
            LEFT JOIN chat_room_participants p ON p.room_id = r.id AND p.user_id = $2
            WHERE r.id = $1 AND r.closed_at IS NULL
            "#,
        )
        .bind(room_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        match row {
            None => Err(DomainError::RoomNotFound(room_id)),
            Some(RoomMembershipRow { is_member: false }) => {
                Err(DomainError::NotRoomMember { user_id, room_id })
            }
            Some(_) => Ok(()),
        }
    }
}
