//! WebSocket frames exchanged on a race socket.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dto::{
    race::RaceSnapshot,
    sse::Advisory,
    transact::{TransactResponse, TxOpInput},
};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from race WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RaceInboundMessage {
    /// Apply a batch of operations.
    Transact {
        /// Operations, applied in order.
        ops: Vec<TxOpInput>,
    },
    /// Any frame type this server does not know.
    #[serde(other)]
    Unknown,
}

impl RaceInboundMessage {
    /// Parse a text frame.
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Messages pushed to race WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RaceOutboundMessage {
    /// Current state of the race.
    Snapshot(RaceSnapshot),
    /// A batch sent on this socket was committed.
    Ack(TransactResponse),
    /// A batch sent on this socket was rejected.
    Error {
        /// Why the batch was refused.
        message: String,
    },
    /// Device warning; informational only.
    Advisory(Advisory),
}
