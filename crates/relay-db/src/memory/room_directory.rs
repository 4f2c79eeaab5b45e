//! Room membership held in a concurrent map

use async_trait::async_trait;
use dashmap::DashMap;
use relay_core::{CollaboratorResult, DomainError, RoomAuthorizer, Snowflake};
use std::collections::HashSet;

/// Room → participants
#[derive(Debug, Default)]
pub struct InMemoryRoomDirectory {
    rooms: DashMap<Snowflake, HashSet<Snowflake>>,
}

impl InMemoryRoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room (if needed) and add participants to it
    pub fn add_participants(&self, room_id: Snowflake, users: impl IntoIterator<Item = Snowflake>) {
        self.rooms.entry(room_id).or_default().extend(users);
    }

    /// Revoke one participant; returns whether they were present
    pub fn remove_participant(&self, room_id: Snowflake, user_id: Snowflake) -> bool {
        self.rooms
            .get_mut(&room_id)
            .is_some_and(|mut members| members.remove(&user_id))
    }

    /// Close a room entirely
    pub fn close_room(&self, room_id: Snowflake) -> bool {
        self.rooms.remove(&room_id).is_some()
    }
}

#[async_trait]
impl RoomAuthorizer for InMemoryRoomDirectory {
    async fn authorize_room_membership(
        &self,
        user_id: Snowflake,
        room_id: Snowflake,
    ) -> CollaboratorResult<()> {
        let members = self
            .rooms
            .get(&room_id)
            .ok_or(DomainError::RoomNotFound(room_id))?;

        if members.contains(&user_id) {
            Ok(())
        } else {
            Err(DomainError::NotRoomMember { user_id, room_id })
        }
    }
}
