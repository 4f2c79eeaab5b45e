//! Individual WebSocket connection
//!
//! Represents a single live transport, the identity it was admitted with,
//! and its bounded outbound queue.

use crate::liveness::LivenessMonitor;
use crate::protocol::{CloseCode, GatewayMessage, OpCode};
use parking_lot::Mutex;
use relay_common::HubConfig;
use relay_core::Snowflake;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Receiving end of a connection's outbound queue, drained by the writer pump
pub type OutboundReceiver = mpsc::Receiver<GatewayMessage>;

/// Hub-assigned connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What a connection receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionRole {
    /// Chat connection bound to one room at admission
    RoomScoped { room_id: Snowflake },
    /// Notification connection that receives everything addressed to its user
    UserScoped,
}

impl ConnectionRole {
    pub fn room_id(&self) -> Option<Snowflake> {
        match self {
            Self::RoomScoped { room_id } => Some(*room_id),
            Self::UserScoped => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomScoped { .. } => "room",
            Self::UserScoped => "user",
        }
    }
}

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registered and accepting outbound messages
    Active,
    /// Torn down; pumps are finishing
    Closing,
    /// Both pumps have exited
    Closed,
}

/// Why a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer sent a close frame or the stream ended
    PeerClosed,
    /// Read or write on the socket failed
    TransportError,
    /// Ping went unanswered for the pong timeout
    HeartbeatTimeout,
    /// Outbound queue overflowed
    SlowConsumer,
    /// Peer sent something that is not a gateway message
    DecodeError,
    /// Peer sent a server-only op code
    UnknownOpcode,
    /// Room authorization failed on an inbound message
    MembershipRevoked,
    /// Administrative removal
    Dismissed,
    /// Hub shut down
    ServerShutdown,
}

impl CloseReason {
    /// Code sent in the close frame; peer-initiated endings send a plain close
    pub fn close_code(self) -> Option<CloseCode> {
        match self {
            Self::PeerClosed | Self::TransportError => None,
            Self::HeartbeatTimeout => Some(CloseCode::HeartbeatTimeout),
            Self::SlowConsumer => Some(CloseCode::SlowConsumer),
            Self::DecodeError => Some(CloseCode::DecodeError),
            Self::UnknownOpcode => Some(CloseCode::UnknownOpcode),
            Self::MembershipRevoked => Some(CloseCode::NotAuthorized),
            Self::Dismissed => Some(CloseCode::Dismissed),
            Self::ServerShutdown => Some(CloseCode::ServerShutdown),
        }
    }

    /// Whether already-queued messages are still written before the close frame
    pub fn flushes_queue(self) -> bool {
        matches!(
            self,
            Self::MembershipRevoked | Self::Dismissed | Self::ServerShutdown
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PeerClosed => "peer_closed",
            Self::TransportError => "transport_error",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::SlowConsumer => "slow_consumer",
            Self::DecodeError => "decode_error",
            Self::UnknownOpcode => "unknown_opcode",
            Self::MembershipRevoked => "membership_revoked",
            Self::Dismissed => "dismissed",
            Self::ServerShutdown => "server_shutdown",
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a message could not be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("outbound queue is full")]
    Overflow,

    #[error("connection is closed")]
    Closed,
}

#[derive(Debug)]
struct Lifecycle {
    state: ConnectionState,
    reason: Option<CloseReason>,
}

/// A single admitted WebSocket connection
pub struct Connection {
    id: ConnectionId,
    user_id: Snowflake,
    role: ConnectionRole,

    lifecycle: Mutex<Lifecycle>,

    /// Bounded outbound queue
    sender: mpsc::Sender<GatewayMessage>,

    /// Cancelled exactly once, when the connection leaves `Active`
    shutdown: CancellationToken,

    /// Last Dispatch sequence number queued
    sequence: AtomicU64,

    liveness: Mutex<LivenessMonitor>,

    last_activity: Mutex<Instant>,

    connected_at: Instant,
}

impl Connection {
    /// Create a connection and the receiver for its outbound queue
    pub fn new(
        user_id: Snowflake,
        role: ConnectionRole,
        config: &HubConfig,
    ) -> (Arc<Self>, OutboundReceiver) {
        let (sender, receiver) = mpsc::channel(config.outbound_queue_capacity.max(1));
        let now = Instant::now();
        let connection = Arc::new(Self {
            id: ConnectionId::new(),
            user_id,
            role,
            lifecycle: Mutex::new(Lifecycle {
                state: ConnectionState::Active,
                reason: None,
            }),
            sender,
            shutdown: CancellationToken::new(),
            sequence: AtomicU64::new(0),
            liveness: Mutex::new(LivenessMonitor::new(config.pong_timeout)),
            last_activity: Mutex::new(now),
            connected_at: now,
        });
        (connection, receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> Snowflake {
        self.user_id
    }

    pub fn role(&self) -> ConnectionRole {
        self.role
    }

    /// Room this connection is bound to (room-scoped only)
    pub fn room_id(&self) -> Option<Snowflake> {
        self.role.room_id()
    }

    pub fn state(&self) -> ConnectionState {
        self.lifecycle.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Active
    }

    /// Reason recorded by the teardown, once there has been one
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.lifecycle.lock().reason
    }

    /// Queue a message without waiting
    ///
    /// Dispatch messages get the next sequence number for this connection.
    /// Dispatches are only queued by the hub actor, so sequence order and
    /// queue order agree.
    pub fn send(&self, message: GatewayMessage) -> Result<(), SendError> {
        if !self.is_active() {
            return Err(SendError::Closed);
        }

        let message = if message.op == OpCode::Dispatch {
            message.with_sequence(self.next_sequence())
        } else {
            message
        };

        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Overflow,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Active -> Closing, recording `reason` and cancelling both pumps
    ///
    /// Returns `false` if the connection had already left `Active`.
    pub(crate) fn begin_close(&self, reason: CloseReason) -> bool {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state != ConnectionState::Active {
                return false;
            }
            lifecycle.state = ConnectionState::Closing;
            lifecycle.reason = Some(reason);
        }
        self.shutdown.cancel();
        true
    }

    /// Both pumps are done
    pub(crate) fn mark_closed(&self) {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.state = ConnectionState::Closed;
    }

    /// Token cancelled when the connection starts closing
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Sequence number of the last dispatch queued
    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    // === Liveness ===

    /// Note a pong (transport frame or application heartbeat)
    pub fn record_pong(&self) -> bool {
        self.liveness.lock().pong_received(Instant::now())
    }

    pub(crate) fn record_ping_sent(&self) {
        self.liveness.lock().ping_sent(Instant::now());
    }

    pub(crate) fn should_ping(&self) -> bool {
        self.liveness.lock().should_ping()
    }

    /// When the outstanding ping expires, if there is one
    pub fn liveness_deadline(&self) -> Option<Instant> {
        self.liveness.lock().deadline()
    }

    /// Whether the outstanding ping has gone unanswered for the pong timeout
    pub fn liveness_expired(&self) -> bool {
        self.liveness.lock().is_expired(Instant::now())
    }

    // === Activity ===

    /// Record inbound traffic
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the last inbound frame
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .field("state", &self.state())
            .finish()
    }
}
