//! Race snapshot payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::state::{
    race::{Entrant, Race},
    transaction::RaceAggregate,
};

/// Placeholder shown in the roster for entrants who left their name empty.
pub const UNNAMED: &str = "Unnamed";

/// Race record as exposed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RaceSummary {
    /// Race identifier.
    pub id: Uuid,
    /// Paragraph to type.
    pub text: String,
    /// Epoch milliseconds at which typing opens; absent until started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    /// Epoch milliseconds at which the race was created.
    pub created_at: u64,
}

/// Entrant record as exposed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntrantSummary {
    /// Entrant identifier, generated by the participant's client.
    pub id: Uuid,
    /// Race the entrant joined.
    pub race_id: Option<Uuid>,
    /// Display name, possibly empty.
    pub name: String,
    /// Team label, possibly empty.
    pub team: String,
    /// Share of the text typed, as last written.
    pub progress: f64,
    /// Finish timestamp in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<u64>,
}

impl EntrantSummary {
    /// Name as shown in the roster.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            UNNAMED
        } else {
            &self.name
        }
    }
}

/// A race and its linked entrants, as pushed to every subscriber after a change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RaceSnapshot {
    /// The race record.
    pub race: RaceSummary,
    /// Linked entrants in join order.
    pub entrants: Vec<EntrantSummary>,
    /// Increases with every committed change; lets clients drop stale snapshots.
    pub version: u64,
}

impl RaceSnapshot {
    /// Roster names in join order, with the empty-name placeholder applied.
    pub fn roster(&self) -> Vec<String> {
        self.entrants
            .iter()
            .map(|entrant| entrant.display_name().to_owned())
            .collect()
    }
}

/// Payload used to open a new race.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateRaceRequest {
    /// Paragraph to type. A configured paragraph is picked when omitted.
    #[serde(default)]
    #[validate(length(min = 1, max = 10000))]
    pub text: Option<String>,
}

impl From<Race> for RaceSummary {
    fn from(value: Race) -> Self {
        Self {
            id: value.id,
            text: value.text,
            started_at: value.started_at,
            created_at: value.created_at,
        }
    }
}

impl From<Entrant> for EntrantSummary {
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

impl From<RaceAggregate> for RaceSnapshot {
    fn from(value: RaceAggregate) -> Self {
        let version = value.race.version;
        Self {
            race: value.race.into(),
            entrants: value.entrants.into_iter().map(Into::into).collect(),
            version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_uses_placeholder_for_empty_names() {
        let race_id = Uuid::new_v4();
        let entrant = |name: &str| EntrantSummary {
            id: Uuid::new_v4(),
            race_id: Some(race_id),
            name: name.into(),
            team: String::new(),
            progress: 0.0,
            finished_at: None,
        };
        let snapshot = RaceSnapshot {
            race: RaceSummary {
                id: race_id,
                text: "text".into(),
                started_at: None,
                created_at: 0,
            },
            entrants: vec![entrant("Ada"), entrant("")],
            version: 1,
        };

        assert_eq!(snapshot.roster(), vec!["Ada", "Unnamed"]);
        // Placeholder is display-only.
        assert_eq!(snapshot.entrants[1].name, "");
    }

    #[test]
    fn race_serializes_with_camel_case_and_optional_start() {
        let summary = RaceSummary {
            id: Uuid::nil(),
            text: "abc".into(),
            started_at: None,
            created_at: 5,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["createdAt"], 5);
        assert!(value.get("startedAt").is_none());

        let started = RaceSummary {
            started_at: Some(9),
            ..summary
        };
        assert_eq!(serde_json::to_value(&started).unwrap()["startedAt"], 9);
    }
}
