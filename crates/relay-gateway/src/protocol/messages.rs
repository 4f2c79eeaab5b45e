//! Gateway message format
//!
//! Every text frame in either direction is one JSON-encoded [`GatewayMessage`].

use super::{
    CloseCode, DispatchEvent, HelloPayload, MessageRejectedPayload, OpCode, SendMessagePayload,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway message envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event type (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Per-connection sequence number (only for op=0 Dispatch)
    ///
    /// Assigned when the message is queued on a connection, so the same
    /// broadcast carries a different `s` on every recipient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event data payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl GatewayMessage {
    // === Server Messages ===

    /// Create a Dispatch message (op=0) without a sequence number
    #[must_use]
    pub fn dispatch(event: DispatchEvent, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event.as_str().to_string()),
            s: None,
            d: Some(data),
        }
    }

    /// Create a Dispatch message from any serializable payload
    pub fn dispatch_of<T: Serialize>(
        event: DispatchEvent,
        data: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::dispatch(event, serde_json::to_value(data)?))
    }

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(payload: &HelloPayload) -> Self {
        Self {
            op: OpCode::Hello,
            t: None,
            s: None,
            d: serde_json::to_value(payload).ok(),
        }
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self {
            op: OpCode::HeartbeatAck,
            t: None,
            s: None,
            d: None,
        }
    }

    /// Create a Message Rejected message (op=3)
    #[must_use]
    pub fn message_rejected(payload: &MessageRejectedPayload) -> Self {
        Self {
            op: OpCode::MessageRejected,
            t: None,
            s: None,
            d: serde_json::to_value(payload).ok(),
        }
    }

    // === Parsing Client Messages ===

    /// Try to parse as a Send Message payload (op=2)
    pub fn as_send_message(&self) -> Option<SendMessagePayload> {
        if self.op != OpCode::SendMessage {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Event type of a Dispatch, if it is one we know
    pub fn event(&self) -> Option<DispatchEvent> {
        self.t.as_deref().and_then(DispatchEvent::parse)
    }

    // === Utilities ===

    /// Return the message with `s` set
    #[must_use]
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.s = Some(sequence);
        self
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Code and reason for a close frame
    #[must_use]
    pub fn close_frame(code: CloseCode) -> (u16, String) {
        (code.as_u16(), code.description().to_string())
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
