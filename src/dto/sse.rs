//! Server-sent event payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Named SSE frame with a JSON body, ready to be written to a race stream.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerEvent {
    /// `event:` field.
    pub name: &'static str,
    /// Serialized JSON body.
    pub data: String,
}

impl ServerEvent {
    /// Serialize `payload` as the body of a `name` event.
    pub fn json<T: Serialize>(name: &'static str, payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            name,
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Race the stream is bound to.
    pub race_id: Uuid,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a persistence backend.
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Non-blocking warning shown to clients on unsupported devices.
pub struct Advisory {
    /// Text to show.
    pub message: String,
}
