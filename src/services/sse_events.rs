//! Builders for the events sent on a race SSE stream.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::dto::{
    race::RaceSnapshot,
    sse::{Advisory, Handshake, ServerEvent},
};

/// Event name of the connection handshake.
pub const EVENT_HANDSHAKE: &str = "handshake";
/// Event name of device advisories.
pub const EVENT_ADVISORY: &str = "advisory";
/// Event name of race snapshots.
pub const EVENT_RACE_SNAPSHOT: &str = "race.snapshot";

/// First event of every race stream.
pub fn handshake(race_id: Uuid, degraded: bool) -> Option<ServerEvent> {
    let payload = Handshake {
        race_id,
        message: format!("subscribed to race {race_id}"),
        degraded,
    };
    to_event(EVENT_HANDSHAKE, &payload)
}

/// Device advisory event.
pub fn advisory(advisory: &Advisory) -> Option<ServerEvent> {
    to_event(EVENT_ADVISORY, advisory)
}

/// Full state of a race after a change.
pub fn race_snapshot(snapshot: &RaceSnapshot) -> Option<ServerEvent> {
    to_event(EVENT_RACE_SNAPSHOT, snapshot)
}

fn to_event<T>(event: &'static str, payload: &T) -> Option<ServerEvent>
where
    T: Serialize,
{
    match ServerEvent::json(event, payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}
