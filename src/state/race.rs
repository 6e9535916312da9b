//! In-memory race and entrant records.

use indexmap::IndexSet;
use uuid::Uuid;

use crate::{
    dao::models::{EntrantEntity, RaceEntity},
    state::lifecycle::RaceLifecycle,
};

/// Runtime representation of a race held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Race {
    /// Stable identifier, also the route parameter of the race page.
    pub id: Uuid,
    /// Paragraph to type.
    pub text: String,
    /// Epoch milliseconds at which typing opens; `None` until someone starts the race.
    pub started_at: Option<u64>,
    /// Epoch milliseconds at which the record was created.
    pub created_at: u64,
    /// Entrants linked to the race, in join order.
    pub entrant_ids: IndexSet<Uuid>,
    /// Bumped on every committed change visible in the race snapshot.
    pub version: u64,
}

/// A participant's record within a race.
#[derive(Debug, Clone, PartialEq)]
pub struct Entrant {
    /// Identifier generated once per browser and race.
    pub id: Uuid,
    /// Race the entrant has been linked to.
    pub race_id: Option<Uuid>,
    /// Display name, possibly empty.
    pub name: String,
    /// Team label, possibly empty.
    pub team: String,
    /// Reserved for typed fraction; nothing computes it.
    pub progress: f64,
    /// Reserved finish timestamp; nothing sets it.
    pub finished_at: Option<u64>,
}

impl Race {
    /// Build an unstarted race with no entrants.
    pub fn new(id: Uuid, text: String, created_at: u64) -> Self {
        Self {
            id,
            text,
            started_at: None,
            created_at,
            entrant_ids: IndexSet::new(),
            version: 0,
        }
    }

    /// Stored lifecycle derived from the start timestamp.
    pub fn lifecycle(&self) -> RaceLifecycle {
        RaceLifecycle::from_started_at(self.started_at)
    }
}

impl Entrant {
    /// Build an entrant with empty profile fields.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            race_id: None,
            name: String::new(),
            team: String::new(),
            progress: 0.0,
            finished_at: None,
        }
    }
}

impl From<RaceEntity> for Race {
    fn from(value: RaceEntity) -> Self {
        Self {
            id: value.id,
            text: value.text,
            started_at: value.started_at,
            created_at: value.created_at,
            entrant_ids: value.entrant_ids.into_iter().collect(),
            version: value.version,
        }
    }
}

impl From<Race> for RaceEntity {
    fn from(value: Race) -> Self {
        Self {
            id: value.id,
            text: value.text,
            started_at: value.started_at,
            created_at: value.created_at,
            entrant_ids: value.entrant_ids.into_iter().collect(),
            version: value.version,
        }
    }
}

impl From<EntrantEntity> for Entrant {
    fn from(value: EntrantEntity) -> Self {
        Self {
            id: value.id,
            race_id: value.race_id,
            name: value.name,
            team: value.team,
            progress: value.progress,
            finished_at: value.finished_at,
        }
    }
}

impl From<Entrant> for EntrantEntity {
    fn from(value: Entrant) -> Self {
        Self {
            id: value.id,
            race_id: value.race_id,
            name: value.name,
            team: value.team,
            progress: value.progress,
            finished_at: value.finished_at,
        }
    }
}
