//! Transport abstraction for the pumps
//!
//! The pumps speak [`Frame`]s so they can run over an axum WebSocket in
//! production and over in-process channels in tests.

use futures::{Sink, Stream};

/// One WebSocket frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    /// Close with an optional (code, reason)
    Close(Option<(u16, String)>),
}

impl Frame {
    /// Text payload, if this is a text frame
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Close code, if this is a close frame carrying one
    pub fn close_code(&self) -> Option<u16> {
        match self {
            Self::Close(Some((code, _))) => Some(*code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,

    #[error("transport error: {0}")]
    Io(String),
}

/// Outgoing half of a transport
pub trait FrameSink: Sink<Frame, Error = TransportError> + Unpin + Send + 'static {}

impl<T> FrameSink for T where T: Sink<Frame, Error = TransportError> + Unpin + Send + 'static {}

/// Incoming half of a transport
pub trait FrameStream: Stream<Item = Result<Frame, TransportError>> + Unpin + Send + 'static {}

impl<T> FrameStream for T where T: Stream<Item = Result<Frame, TransportError>> + Unpin + Send + 'static
{}
