//! Hub handle
//!
//! Cheap to clone; every clone talks to the same actor. Operations that
//! touch the registry round-trip through the actor. Collaborator calls
//! (authorization, persistence) run on the caller's task so a slow store
//! never stalls fan-out for other rooms.

use super::actor::{HubActor, HubCommand};
use super::{
    AdmitError, DeliveryReport, DeliveryServices, HubError, HubStats, InboundError, NotifyError,
    OutboundEvent,
};
use crate::connection::{
    supervise, CloseReason, Connection, ConnectionId, ConnectionRole, Frame, FrameSink,
    FrameStream,
};
use crate::protocol::{DispatchEvent, GatewayMessage, HelloPayload};
use futures_util::SinkExt;
use relay_common::HubConfig;
use relay_core::{ChatMessage, Notification, Snowflake};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    commands: mpsc::Sender<HubCommand>,
    config: HubConfig,
    services: DeliveryServices,
}

/// An admitted connection whose pumps are running
#[derive(Debug)]
pub struct ServedConnection {
    connection: Arc<Connection>,
    task: JoinHandle<CloseReason>,
}

impl ServedConnection {
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// Wait for both pumps to finish; returns why the connection ended
    pub async fn closed(self) -> CloseReason {
        match self.task.await {
            Ok(reason) => reason,
            Err(e) => {
                warn!(connection_id = %self.connection.id(), error = %e, "Connection task failed");
                self.connection
                    .close_reason()
                    .unwrap_or(CloseReason::TransportError)
            }
        }
    }
}

impl Hub {
    /// Start the hub actor on the current runtime
    pub fn spawn(config: HubConfig, services: DeliveryServices) -> Self {
        let (commands, receiver) = mpsc::channel(config.command_buffer.max(1));
        tokio::spawn(HubActor::new(receiver, config.clone()).run());

        Self {
            inner: Arc::new(HubInner {
                commands,
                config,
                services,
            }),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn services(&self) -> &DeliveryServices {
        &self.inner.services
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> HubCommand,
    ) -> Result<T, HubError> {
        let (reply, response) = oneshot::channel();
        self.inner
            .commands
            .send(command(reply))
            .await
            .map_err(|_| HubError::Closed)?;
        response.await.map_err(|_| HubError::Closed)
    }

    // === Registry ===

    /// Register a connection; visible to fan-out once this returns `Ok`
    pub async fn admit_connection(&self, connection: Arc<Connection>) -> Result<(), AdmitError> {
        self.request(|reply| HubCommand::Admit { connection, reply })
            .await?
    }

    /// Remove a connection and signal it to close
    ///
    /// Returns `false` if it was not registered (already torn down).
    pub async fn dismiss_connection(
        &self,
        connection_id: ConnectionId,
        reason: CloseReason,
    ) -> Result<bool, HubError> {
        self.request(|reply| HubCommand::Dismiss {
            connection_id,
            reason,
            reply,
        })
        .await
    }

    /// Dismiss every live connection of a user, chat and notification alike
    pub async fn dismiss_user(
        &self,
        user_id: Snowflake,
        reason: CloseReason,
    ) -> Result<usize, HubError> {
        self.request(|reply| HubCommand::DismissUser {
            user_id,
            reason,
            reply,
        })
        .await
    }

    /// Registered connection by id
    pub async fn connection(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Option<Arc<Connection>>, HubError> {
        self.request(|reply| HubCommand::Lookup {
            connection_id,
            reply,
        })
        .await
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        self.request(|reply| HubCommand::Stats { reply }).await
    }

    /// Close every connection and stop the actor
    ///
    /// Returns how many connections were closed.
    pub async fn shutdown(&self) -> Result<usize, HubError> {
        self.request(|reply| HubCommand::Shutdown { reply }).await
    }

    // === Delivery ===

    pub async fn deliver(&self, event: OutboundEvent) -> Result<DeliveryReport, HubError> {
        self.request(|reply| HubCommand::Deliver { event, reply })
            .await
    }

    /// Fan `payload` out to every connection in the room except `exclude`
    pub async fn broadcast(
        &self,
        room_id: Snowflake,
        payload: GatewayMessage,
        exclude: Option<ConnectionId>,
    ) -> Result<DeliveryReport, HubError> {
        self.deliver(OutboundEvent::RoomBroadcast {
            room_id,
            payload,
            exclude,
        })
        .await
    }

    /// Push to every notification connection of a user
    ///
    /// A user with no live connection gets an empty report.
    pub async fn push_to_user(
        &self,
        user_id: Snowflake,
        payload: GatewayMessage,
    ) -> Result<DeliveryReport, HubError> {
        self.deliver(OutboundEvent::DirectToUser { user_id, payload })
            .await
    }

    /// Persist a notification, then push it live
    pub async fn notify_user(
        &self,
        notification: &Notification,
    ) -> Result<DeliveryReport, NotifyError> {
        self.services()
            .notification_store()
            .persist_and_mark_deliverable(notification)
            .await
            .map_err(|e| {
                warn!(
                    notification_id = %notification.id,
                    user_id = %notification.user_id,
                    error = %e,
                    "Notification not stored, skipping push"
                );
                NotifyError::Persistence(e)
            })?;

        let payload = GatewayMessage::dispatch_of(DispatchEvent::NotificationCreate, notification)?;
        let report = self.push_to_user(notification.user_id, payload).await?;
        debug!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            delivered = report.delivered,
            "Notification pushed"
        );
        Ok(report)
    }

    /// Store a chat message from `connection_id` and broadcast the stored copy
    ///
    /// The sender must still be registered and room-scoped, and the room
    /// authorizer is consulted again. Nothing is broadcast unless the store
    /// accepted the message and the sender is still registered once it has.
    pub async fn handle_inbound_message(
        &self,
        connection_id: ConnectionId,
        content: &str,
    ) -> Result<ChatMessage, InboundError> {
        let connection = self
            .connection(connection_id)
            .await?
            .ok_or(InboundError::NotRegistered(connection_id))?;
        let room_id = connection.room_id().ok_or(InboundError::NotRoomScoped)?;
        let sender_id = connection.user_id();

        validate_content(content)?;

        self.services()
            .room_authorizer()
            .authorize_room_membership(sender_id, room_id)
            .await
            .map_err(|e| {
                if e.is_authorization() {
                    InboundError::Unauthorized(e)
                } else {
                    InboundError::AuthorizationUnavailable(e)
                }
            })?;

        let message = self
            .services()
            .chat_store()
            .persist_chat_message(room_id, sender_id, content)
            .await
            .map_err(|e| {
                warn!(
                    connection_id = %connection_id,
                    room_id = %room_id,
                    error = %e,
                    "Chat message not stored, not broadcasting"
                );
                InboundError::Persistence(e)
            })?;

        // The sender may have been dismissed while the store was working
        let payload = GatewayMessage::dispatch_of(DispatchEvent::MessageCreate, &message)?;
        let event = OutboundEvent::RoomBroadcast {
            room_id,
            payload,
            exclude: None,
        };
        let report = self
            .request(|reply| HubCommand::DeliverFrom {
                sender: connection_id,
                event,
                reply,
            })
            .await?
            .ok_or_else(|| {
                warn!(
                    connection_id = %connection_id,
                    message_id = %message.id,
                    "Sender left while the message was stored, not broadcasting"
                );
                InboundError::NotRegistered(connection_id)
            })?;
        debug!(
            message_id = %message.id,
            room_id = %room_id,
            delivered = report.delivered,
            evicted = report.evicted,
            "Chat message broadcast"
        );
        Ok(message)
    }

    // === Transport ===

    /// Admit a new connection over `sink`/`stream` and start its pumps
    ///
    /// `Hello` is the first frame the peer sees. If admission fails the
    /// peer is sent a close frame and the error is returned.
    pub async fn serve_connection<S, R>(
        &self,
        user_id: Snowflake,
        role: ConnectionRole,
        mut sink: S,
        stream: R,
    ) -> Result<ServedConnection, AdmitError>
    where
        S: FrameSink,
        R: FrameStream,
    {
        let config = self.config();
        let (connection, outbound) = Connection::new(user_id, role, config);

        let hello = HelloPayload::new(
            connection.id().to_string(),
            config.heartbeat_interval.as_millis() as u64,
        );
        // The queue is empty and holds at least one message
        if connection.send(GatewayMessage::hello(&hello)).is_err() {
            return Err(AdmitError::NotActive(connection.id()));
        }

        // Admitted but not yet pumped until the spawn below
        let pending = PendingAdmission::new(self.clone(), connection.id());
        if let Err(e) = self.admit_connection(Arc::clone(&connection)).await {
            pending.disarm();
            debug!(connection_id = %connection.id(), error = %e, "Admission refused");
            let (code, reason) = GatewayMessage::close_frame(e.close_code());
            let _ = sink.send(Frame::Close(Some((code, reason)))).await;
            let _ = sink.close().await;
            return Err(e);
        }

        pending.disarm();
        let task = tokio::spawn(supervise(
            self.clone(),
            Arc::clone(&connection),
            outbound,
            sink,
            stream,
            config.heartbeat_interval,
        ));

        Ok(ServedConnection { connection, task })
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("config", &self.inner.config)
            .field("running", &!self.inner.commands.is_closed())
            .finish()
    }
}

/// Dismisses a connection whose `serve_connection` future was dropped
/// between admission and the pump spawn
struct PendingAdmission {
    hub: Hub,
    connection_id: ConnectionId,
    armed: bool,
}

impl PendingAdmission {
    fn new(hub: Hub, connection_id: ConnectionId) -> Self {
        Self {
            hub,
            connection_id,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingAdmission {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let hub = self.hub.clone();
        let connection_id = self.connection_id;
        debug!(connection_id = %connection_id, "Admission abandoned, dismissing");
        runtime.spawn(async move {
            // Also covers an admit that lands after the drop
            let _ = hub
                .dismiss_connection(connection_id, CloseReason::Dismissed)
                .await;
        });
    }
}

fn validate_content(content: &str) -> Result<(), InboundError> {
    if content.trim().is_empty() {
        return Err(InboundError::EmptyContent);
    }
    if content.chars().count() > ChatMessage::MAX_CONTENT_LENGTH {
        return Err(InboundError::ContentTooLong {
            max: ChatMessage::MAX_CONTENT_LENGTH,
        });
    }
    Ok(())
}
