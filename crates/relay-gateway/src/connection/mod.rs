//! WebSocket connection management
//!
//! A [`Connection`] is shared between the hub (which queues onto it) and its
//! two pump tasks (which drain the queue and read the socket).

mod connection;
mod pumps;
mod transport;

pub use connection::{
    CloseReason, Connection, ConnectionId, ConnectionRole, ConnectionState, OutboundReceiver,
    SendError,
};
pub use transport::{Frame, FrameSink, FrameStream, TransportError};

pub(crate) use pumps::supervise;
