//! WebSocket message types: envelope and commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Builds a server message stamped with the current time.
    #[must_use]
    pub fn new(id: String, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id,
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Builds an error message with a numeric code.
    #[must_use]
    pub fn error(id: String, code: u32, message: &str) -> Self {
        Self::new(
            id,
            WsMessageType::Error,
            serde_json::json!({
                "code": code,
                "message": message,
            }),
        )
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client broadcast notification.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands that a client can send over WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Subscribe to notifications for specific events.
    Subscribe {
        /// Event serials to subscribe to. Use `["*"]` for all events.
        event_serials: Vec<String>,
    },
    /// Unsubscribe from notifications for specific events.
    Unsubscribe {
        /// Event serials to unsubscribe from.
        event_serials: Vec<String>,
    },
    /// Register participants on an event.
    Register {
        /// Target event serial.
        event_serial: String,
        /// Participant references.
        references: Vec<String>,
    },
    /// Remove participants from an event.
    Unregister {
        /// Target event serial.
        event_serial: String,
        /// Participant references.
        references: Vec<String>,
    },
    /// Get the event with its participants and groups.
    GetPeople {
        /// Target event serial.
        event_serial: String,
    },
}
