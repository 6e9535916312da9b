//! CouchDB document shapes for races and entrants.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::CouchDaoError;
use crate::dao::{
    models::{EntrantEntity, RaceEntity},
    storage::RecordKind,
};

/// `_id` prefix of race documents.
pub const RACE_PREFIX: &str = "race::";
/// `_id` prefix of entrant documents.
pub const ENTRANT_PREFIX: &str = "entrant::";

/// Answer of `POST _all_docs?include_docs=true`.
#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    /// One row per requested key, in request order.
    pub rows: Vec<AllDocsRow>,
}

/// Row of an `_all_docs` answer. Rows for unknown keys carry an `error`
/// instead of a document.
#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    /// Document body, absent for unknown keys.
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Body of an `_all_docs` batch fetch.
#[derive(Debug, Serialize)]
pub struct AllDocsKeys {
    /// Document ids to fetch.
    pub keys: Vec<String>,
}

/// Stored race document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchRaceDocument {
    /// `race::{uuid}`.
    #[serde(rename = "_id")]
    pub id: String,
    /// Revision to overwrite; absent for a first write.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Race fields.
    #[serde(flatten)]
    pub race: RaceBody,
}

/// Race fields of a [`CouchRaceDocument`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceBody {
    /// Paragraph to type.
    pub text: String,
    /// Start timestamp in epoch milliseconds.
    pub started_at: Option<u64>,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: u64,
    /// Linked entrants in join order.
    pub entrant_ids: Vec<Uuid>,
    /// Snapshot version at the time of the write.
    pub version: u64,
}

/// Stored entrant document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchEntrantDocument {
    /// `entrant::{uuid}`.
    #[serde(rename = "_id")]
    pub id: String,
    /// Revision to overwrite; absent for a first write.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Entrant fields.
    #[serde(flatten)]
    pub entrant: EntrantBody,
}

/// Entrant fields of a [`CouchEntrantDocument`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrantBody {
    /// Race the entrant joined.
    pub race_id: Option<Uuid>,
    /// Display name.
    pub name: String,
    /// Team label.
    pub team: String,
    /// Share of the text typed.
    pub progress: f64,
    /// Finish timestamp in epoch milliseconds.
    pub finished_at: Option<u64>,
}

impl CouchRaceDocument {
    /// Document for `race`, without revision.
    pub fn from_entity(race: RaceEntity) -> Self {
        Self {
            id: race_doc_id(race.id),
            rev: None,
            race: RaceBody {
                text: race.text,
                started_at: race.started_at,
                created_at: race.created_at,
                entrant_ids: race.entrant_ids,
                version: race.version,
            },
        }
    }

    /// Map back to a record; fails on a malformed `_id`.
    pub fn try_into_entity(self) -> Result<RaceEntity, CouchDaoError> {
        let id = parse_doc_id(&self.id, RACE_PREFIX, RecordKind::Race)?;
        Ok(RaceEntity {
            id,
            text: self.race.text,
            started_at: self.race.started_at,
            created_at: self.race.created_at,
            entrant_ids: self.race.entrant_ids,
            version: self.race.version,
        })
    }
}

impl CouchEntrantDocument {
    /// Document for `entrant`, without revision.
    pub fn from_entity(entrant: EntrantEntity) -> Self {
        Self {
            id: entrant_doc_id(entrant.id),
            rev: None,
            entrant: EntrantBody {
                race_id: entrant.race_id,
                name: entrant.name,
                team: entrant.team,
                progress: entrant.progress,
                finished_at: entrant.finished_at,
            },
        }
    }

    /// Map back to a record; fails on a malformed `_id`.
    pub fn try_into_entity(self) -> Result<EntrantEntity, CouchDaoError> {
        let id = parse_doc_id(&self.id, ENTRANT_PREFIX, RecordKind::Entrant)?;
        Ok(EntrantEntity {
            id,
            race_id: self.entrant.race_id,
            name: self.entrant.name,
            team: self.entrant.team,
            progress: self.entrant.progress,
            finished_at: self.entrant.finished_at,
        })
    }
}

/// `_id` of a race document.
pub fn race_doc_id(id: Uuid) -> String {
    format!("{RACE_PREFIX}{id}")
}

/// `_id` of an entrant document.
pub fn entrant_doc_id(id: Uuid) -> String {
    format!("{ENTRANT_PREFIX}{id}")
}

fn parse_doc_id(doc_id: &str, prefix: &str, kind: RecordKind) -> Result<Uuid, CouchDaoError> {
    let invalid = |reason| CouchDaoError::InvalidDocId {
        kind,
        doc_id: doc_id.to_owned(),
        reason,
    };
    let raw = doc_id
        .strip_prefix(prefix)
        .ok_or_else(|| invalid("unexpected prefix"))?;
    Uuid::parse_str(raw).map_err(|_| invalid("malformed UUID"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn race_document_flattens_body_next_to_couch_fields() {
        let race = RaceEntity {
            id: Uuid::new_v4(),
            text: "abc".into(),
            started_at: None,
            created_at: 3,
            entrant_ids: vec![],
            version: 1,
        };
        let value = serde_json::to_value(CouchRaceDocument::from_entity(race.clone())).unwrap();
        assert_eq!(value["_id"], format!("race::{}", race.id));
        assert!(value.get("_rev").is_none());
        assert_eq!(value["text"], "abc");
    }

    #[test]
    fn entrant_document_rejects_foreign_prefix() {
        let entrant = EntrantEntity {
            id: Uuid::new_v4(),
            race_id: None,
            name: String::new(),
            team: String::new(),
            progress: 0.0,
            finished_at: None,
        };
        let mut document = CouchEntrantDocument::from_entity(entrant.clone());
        assert_eq!(document.clone().try_into_entity().unwrap(), entrant);

        document.id = race_doc_id(entrant.id);
        assert!(matches!(
            document.try_into_entity(),
            Err(CouchDaoError::InvalidDocId {
                kind: RecordKind::Entrant,
                reason: "unexpected prefix",
                ..
            })
        ));
    }
}
