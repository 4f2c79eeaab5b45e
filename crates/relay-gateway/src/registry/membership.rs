//! Connection indexes
//!
//! Three maps kept in step:
//! - `connections`: every registered connection by id
//! - `rooms`: room-scoped connections by room
//! - `users`: user-scoped connections by user
//!
//! A connection appears in exactly one of `rooms` / `users`, chosen by its
//! role. Lookups return snapshots, so callers can iterate while the
//! registry is mutated.

use crate::connection::{Connection, ConnectionId, ConnectionRole};
use relay_core::Snowflake;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),
}

#[derive(Debug, Default)]
pub struct MembershipRegistry {
    connections: HashMap<ConnectionId, Arc<Connection>>,
    rooms: HashMap<Snowflake, HashSet<ConnectionId>>,
    users: HashMap<Snowflake, HashSet<ConnectionId>>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a connection under its room or its user
    pub fn register(&mut self, connection: Arc<Connection>) -> Result<(), RegistryError> {
        let id = connection.id();
        if self.connections.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }

        match connection.role() {
            ConnectionRole::RoomScoped { room_id } => {
                self.rooms.entry(room_id).or_default().insert(id);
            }
            ConnectionRole::UserScoped => {
                self.users.entry(connection.user_id()).or_default().insert(id);
            }
        }
        self.connections.insert(id, connection);
        Ok(())
    }

    /// Remove a connection from every index
    ///
    /// Empty buckets are dropped. Returns `None` if it was not registered.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Arc<Connection>> {
        let connection = self.connections.remove(&id)?;

        let (index, key) = match connection.role() {
            ConnectionRole::RoomScoped { room_id } => (&mut self.rooms, room_id),
            ConnectionRole::UserScoped => (&mut self.users, connection.user_id()),
        };
        if let Some(bucket) = index.get_mut(&key) {
            bucket.remove(&id);
            if bucket.is_empty() {
                index.remove(&key);
            }
        }

        Some(connection)
    }

    pub fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(&id).cloned()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Snapshot of the connections bound to `room_id`
    pub fn members_of_room(&self, room_id: Snowflake) -> Vec<Arc<Connection>> {
        self.snapshot(self.rooms.get(&room_id))
    }

    /// Snapshot of the user-scoped connections of `user_id`
    pub fn connections_of_user(&self, user_id: Snowflake) -> Vec<Arc<Connection>> {
        self.snapshot(self.users.get(&user_id))
    }

    /// Every connection of `user_id`, room-scoped ones included
    pub fn connections_of_user_any_role(&self, user_id: Snowflake) -> Vec<Arc<Connection>> {
        self.connections
            .values()
            .filter(|c| c.user_id() == user_id)
            .cloned()
            .collect()
    }

    /// Whether `id` is currently registered in `room_id`
    pub fn is_in_room(&self, id: ConnectionId, room_id: Snowflake) -> bool {
        self.rooms
            .get(&room_id)
            .is_some_and(|bucket| bucket.contains(&id))
    }

    pub fn room_size(&self, room_id: Snowflake) -> usize {
        self.rooms.get(&room_id).map_or(0, HashSet::len)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of rooms with at least one connection
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of users with at least one user-scoped connection
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn room_scoped_count(&self) -> usize {
        self.rooms.values().map(HashSet::len).sum()
    }

    pub fn user_scoped_count(&self) -> usize {
        self.users.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Ids of every registered connection
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().copied().collect()
    }

    fn snapshot(&self, bucket: Option<&HashSet<ConnectionId>>) -> Vec<Arc<Connection>> {
        bucket
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.connections.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}
