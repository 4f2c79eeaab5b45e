//! Notification entity - a server-originated event addressed to one user

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::Snowflake;

/// Category of a notification, as produced by the business domains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ChatMessage,
    Bid,
    InstallationRequest,
    Maintenance,
    Billing,
    Ticket,
    System,
    /// Any kind the gateway does not know about yet
    #[serde(untagged)]
    Other(String),
}

/// A notification for a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub kind: NotificationKind,
    /// Domain-specific body, opaque to the delivery subsystem
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(id: Snowflake, user_id: Snowflake, kind: NotificationKind, data: Value) -> Self {
        Self {
            id,
            user_id,
            kind,
            data,
            created_at: Utc::now(),
        }
    }
}
