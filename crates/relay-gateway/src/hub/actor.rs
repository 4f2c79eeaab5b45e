//! Hub actor
//!
//! Owns the registry. Commands are handled one at a time, so every
//! registry mutation and every fan-out is serialized. The actor never awaits
//! a connection: fan-out uses non-blocking sends and a full queue is closed
//! on the spot.

use super::{AdmitError, DeliveryReport, HubStats, OutboundEvent};
use crate::connection::{CloseReason, Connection, ConnectionId, SendError};
use crate::registry::{MembershipRegistry, RegistryError};
use relay_common::HubConfig;
use relay_core::Snowflake;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

pub(super) enum HubCommand {
    Admit {
        connection: Arc<Connection>,
        reply: oneshot::Sender<Result<(), AdmitError>>,
    },
    Dismiss {
        connection_id: ConnectionId,
        reason: CloseReason,
        reply: oneshot::Sender<bool>,
    },
    DismissUser {
        user_id: Snowflake,
        reason: CloseReason,
        reply: oneshot::Sender<usize>,
    },
    Deliver {
        event: OutboundEvent,
        reply: oneshot::Sender<DeliveryReport>,
    },
    /// Deliver only while `sender` is still registered
    DeliverFrom {
        sender: ConnectionId,
        event: OutboundEvent,
        reply: oneshot::Sender<Option<DeliveryReport>>,
    },
    Lookup {
        connection_id: ConnectionId,
        reply: oneshot::Sender<Option<Arc<Connection>>>,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
    Shutdown {
        reply: oneshot::Sender<usize>,
    },
}

pub(super) struct HubActor {
    registry: MembershipRegistry,
    commands: mpsc::Receiver<HubCommand>,
    config: HubConfig,
}

impl HubActor {
    pub(super) fn new(commands: mpsc::Receiver<HubCommand>, config: HubConfig) -> Self {
        Self {
            registry: MembershipRegistry::new(),
            commands,
            config,
        }
    }

    /// Process commands until shutdown or until every handle is dropped
    pub(super) async fn run(mut self) {
        info!(
            max_room_size = self.config.max_room_size,
            queue_capacity = self.config.outbound_queue_capacity,
            "Hub started"
        );

        while let Some(command) = self.commands.recv().await {
            if self.handle(command).is_break() {
                break;
            }
        }

        let closed = self.close_all(CloseReason::ServerShutdown);
        info!(closed, "Hub stopped");
    }

    fn handle(&mut self, command: HubCommand) -> ControlFlow<()> {
        // A dropped reply receiver means the caller stopped waiting; the
        // command still took effect.
        match command {
            HubCommand::Admit { connection, reply } => {
                let _ = reply.send(self.admit(connection));
            }
            HubCommand::Dismiss {
                connection_id,
                reason,
                reply,
            } => {
                let _ = reply.send(self.teardown(connection_id, reason));
            }
            HubCommand::DismissUser {
                user_id,
                reason,
                reply,
            } => {
                let _ = reply.send(self.dismiss_user(user_id, reason));
            }
            HubCommand::Deliver { event, reply } => {
                let _ = reply.send(self.deliver(event));
            }
            HubCommand::DeliverFrom {
                sender,
                event,
                reply,
            } => {
                let _ = reply.send(self.deliver_from(sender, event));
            }
            HubCommand::Lookup {
                connection_id,
                reply,
            } => {
                let _ = reply.send(self.registry.get(connection_id));
            }
            HubCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
            HubCommand::Shutdown { reply } => {
                let closed = self.close_all(CloseReason::ServerShutdown);
                info!(closed, "Hub shutting down");
                let _ = reply.send(closed);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn admit(&mut self, connection: Arc<Connection>) -> Result<(), AdmitError> {
        let id = connection.id();
        if !connection.is_active() {
            return Err(AdmitError::NotActive(id));
        }

        if let Some(room_id) = connection.room_id() {
            let members = self.registry.room_size(room_id);
            if !self.config.room_has_capacity(members) {
                warn!(
                    connection_id = %id,
                    room_id = %room_id,
                    members,
                    "Room is full, connection refused"
                );
                return Err(AdmitError::RoomFull {
                    room_id,
                    max: self.config.max_room_size,
                });
            }
        }

        let user_id = connection.user_id();
        let role = connection.role();
        self.registry.register(connection).map_err(|e| {
            warn!(error = %e, "Duplicate registration ignored");
            match e {
                RegistryError::AlreadyRegistered(id) => AdmitError::AlreadyRegistered(id),
            }
        })?;

        info!(
            connection_id = %id,
            user_id = %user_id,
            role = role.name(),
            room_id = ?role.room_id(),
            "Connection admitted"
        );
        Ok(())
    }

    /// The single teardown path: unregister, then Active -> Closing
    ///
    /// Idempotent. Returns whether the connection was registered.
    fn teardown(&mut self, connection_id: ConnectionId, reason: CloseReason) -> bool {
        let Some(connection) = self.registry.remove(connection_id) else {
            debug!(
                connection_id = %connection_id,
                reason = %reason,
                "Teardown of unregistered connection ignored"
            );
            return false;
        };

        if !connection.begin_close(reason) {
            warn!(
                connection_id = %connection_id,
                state = ?connection.state(),
                "Registered connection was not active"
            );
        }

        info!(
            connection_id = %connection_id,
            user_id = %connection.user_id(),
            role = connection.role().name(),
            reason = %reason,
            "Connection removed"
        );
        true
    }

    fn dismiss_user(&mut self, user_id: Snowflake, reason: CloseReason) -> usize {
        let dismissed = self
            .registry
            .connections_of_user_any_role(user_id)
            .into_iter()
            .filter(|connection| self.teardown(connection.id(), reason))
            .count();
        info!(user_id = %user_id, dismissed, reason = %reason, "User dismissed");
        dismissed
    }

    fn deliver(&mut self, event: OutboundEvent) -> DeliveryReport {
        let (targets, payload, exclude) = match event {
            OutboundEvent::RoomBroadcast {
                room_id,
                payload,
                exclude,
            } => (self.registry.members_of_room(room_id), payload, exclude),
            OutboundEvent::DirectToUser { user_id, payload } => {
                (self.registry.connections_of_user(user_id), payload, None)
            }
        };

        let mut report = DeliveryReport::default();
        for connection in targets {
            if exclude == Some(connection.id()) {
                continue;
            }

            match connection.send(payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(SendError::Overflow) => {
                    warn!(
                        connection_id = %connection.id(),
                        user_id = %connection.user_id(),
                        "Outbound queue full, closing slow consumer"
                    );
                    self.teardown(connection.id(), CloseReason::SlowConsumer);
                    report.evicted += 1;
                }
                Err(SendError::Closed) => {
                    debug!(connection_id = %connection.id(), "Recipient already closing");
                    report.skipped += 1;
                }
            }
        }

        report
    }

    fn deliver_from(
        &mut self,
        sender: ConnectionId,
        event: OutboundEvent,
    ) -> Option<DeliveryReport> {
        if !self.registry.contains(sender) {
            debug!(connection_id = %sender, "Sender left before delivery, event dropped");
            return None;
        }
        Some(self.deliver(event))
    }

    fn stats(&self) -> HubStats {
        HubStats {
            connections: self.registry.connection_count(),
            room_connections: self.registry.room_scoped_count(),
            user_connections: self.registry.user_scoped_count(),
            rooms: self.registry.room_count(),
            users: self.registry.user_count(),
        }
    }

    fn close_all(&mut self, reason: CloseReason) -> usize {
        self.registry
            .connection_ids()
            .into_iter()
            .filter(|id| self.teardown(*id, reason))
            .count()
    }
}
