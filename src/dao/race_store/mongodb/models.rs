//! BSON document shapes for races and entrants.

use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::{
    models::{EntrantEntity, RaceEntity},
    storage::RecordKind,
};

/// Race document stored in the `races` collection. Identifiers are kept as
/// hyphenated strings so documents stay readable from the mongo shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRaceDocument {
    #[serde(rename = "_id")]
    id: String,
    text: String,
    started_at: Option<i64>,
    created_at: i64,
    entrant_ids: Vec<String>,
    version: i64,
}

/// Entrant document stored in the `entrants` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoEntrantDocument {
    #[serde(rename = "_id")]
    id: String,
    race_id: Option<String>,
    name: String,
    team: String,
    progress: f64,
    finished_at: Option<i64>,
}

impl From<RaceEntity> for MongoRaceDocument {
    fn from(value: RaceEntity) -> Self {
        Self {
            id: value.id.to_string(),
            text: value.text,
            started_at: value.started_at.map(to_bson_millis),
            created_at: to_bson_millis(value.created_at),
            entrant_ids: value.entrant_ids.iter().map(Uuid::to_string).collect(),
            version: to_bson_millis(value.version),
        }
    }
}

impl TryFrom<MongoRaceDocument> for RaceEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoRaceDocument) -> Result<Self, Self::Error> {
        let entrant_ids = value
            .entrant_ids
            .iter()
            .map(|id| parse_id(id, RecordKind::Entrant))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: parse_id(&value.id, RecordKind::Race)?,
            text: value.text,
            started_at: value.started_at.map(from_bson_millis),
            created_at: from_bson_millis(value.created_at),
            entrant_ids,
            version: from_bson_millis(value.version),
        })
    }
}

impl From<EntrantEntity> for MongoEntrantDocument {
    fn from(value: EntrantEntity) -> Self {
        Self {
            id: value.id.to_string(),
            race_id: value.race_id.map(|id| id.to_string()),
            name: value.name,
            team: value.team,
            progress: value.progress,
            finished_at: value.finished_at.map(to_bson_millis),
        }
    }
}

impl TryFrom<MongoEntrantDocument> for EntrantEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoEntrantDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&value.id, RecordKind::Entrant)?,
            race_id: value
                .race_id
                .as_deref()
                .map(|id| parse_id(id, RecordKind::Race))
                .transpose()?,
            name: value.name,
            team: value.team,
            progress: value.progress,
            finished_at: value.finished_at.map(from_bson_millis),
        })
    }
}

/// Filter matching a document by primary key.
pub fn doc_id(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

/// Filter matching entrants linked to a race.
pub fn by_race(race_id: Uuid) -> Document {
    doc! { "race_id": race_id.to_string() }
}

fn parse_id(raw: &str, kind: RecordKind) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(raw).map_err(|_| MongoDaoError::InvalidId {
        kind,
        id: raw.to_owned(),
    })
}

// BSON only has signed 64-bit integers.
fn to_bson_millis(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_bson_millis(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn race_document_round_trips_identifiers() {
        let entity = RaceEntity {
            id: Uuid::new_v4(),
            text: "abc".into(),
            started_at: Some(1_700_000_000_000),
            created_at: 1_699_999_999_000,
            entrant_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
            version: 4,
        };
        let document = MongoRaceDocument::from(entity.clone());
        assert_eq!(RaceEntity::try_from(document).unwrap(), entity);
    }

    #[test]
    fn malformed_identifier_is_reported() {
        let document = MongoEntrantDocument {
            id: "not-a-uuid".into(),
            race_id: None,
            name: String::new(),
            team: String::new(),
            progress: 0.0,
            finished_at: None,
        };
        let err = EntrantEntity::try_from(document).unwrap_err();
        assert!(matches!(err, MongoDaoError::InvalidId { kind: RecordKind::Entrant, id } if id == "not-a-uuid"));
    }
}
