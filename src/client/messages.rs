//! Push channel message types.
//!
//! Every frame is a JSON envelope `{"type": ..., "payload": ...}`; the payload
//! shape depends on the type.

use serde::{Deserialize, Serialize};

/// Server -> client message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    /// Message type identifier (e.g. "connected", "notification_created")
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ServerMessage {
    pub fn new(msg_type: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn empty(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::Value::Null,
        }
    }
}

/// Infrastructure messages.
pub mod system {
    use serde::{Deserialize, Serialize};

    /// Sent by the server once the subscription is live.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Connected {
        pub recipient_id: i64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Error {
        pub code: String,
        pub message: String,
    }

    impl Error {
        pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
            Self {
                code: code.into(),
                message: message.into(),
            }
        }
    }
}

pub mod msg_types {
    pub const CONNECTED: &str = "connected";
    pub const ERROR: &str = "error";
    /// Payload is a notification row.
    pub const NOTIFICATION_CREATED: &str = "notification_created";
}
