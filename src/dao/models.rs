//! Stored race and entrant records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Race record as persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RaceEntity {
    /// Primary key of the race.
    pub id: Uuid,
    /// Paragraph participants have to type.
    pub text: String,
    /// Epoch milliseconds at which the race opens, once scheduled.
    pub started_at: Option<u64>,
    /// Epoch milliseconds at which the race record was first written.
    pub created_at: u64,
    /// Linked entrants in join order.
    pub entrant_ids: Vec<Uuid>,
    /// Monotonic change counter for the race and its entrants.
    pub version: u64,
}

/// Entrant record as persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntrantEntity {
    /// Primary key of the entrant (client generated).
    pub id: Uuid,
    /// Race this entrant is linked to.
    pub race_id: Option<Uuid>,
    /// Display name.
    pub name: String,
    /// Team label.
    pub team: String,
    /// Reserved typed fraction.
    pub progress: f64,
    /// Reserved finish timestamp (epoch milliseconds).
    pub finished_at: Option<u64>,
}
