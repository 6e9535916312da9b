//! Wire representation of batched writes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::state::transaction::{EntrantPatch, RacePatch, Transaction, TxOp};

/// Batch of record updates and links applied atomically.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct TransactRequest {
    /// Between 1 and 64 operations, applied in order.
    #[validate(length(min = 1, max = 64))]
    pub ops: Vec<TxOpInput>,
}

/// Single operation of a [`TransactRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TxOpInput {
    /// Create or update a race. Absent fields are left untouched.
    UpdateRace {
        /// Race to write.
        id: Uuid,
        /// Paragraph to type.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Start timestamp in epoch milliseconds; written once.
        #[serde(
            default,
            rename = "startedAt",
            skip_serializing_if = "Option::is_none"
        )]
        started_at: Option<u64>,
    },
    /// Create or update an entrant. Absent fields are left untouched.
    UpdateEntrant {
        /// Entrant to write.
        id: Uuid,
        /// Display name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Team label.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        team: Option<String>,
        /// Share of the text typed, stored as given.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<f64>,
        /// Finish timestamp in epoch milliseconds.
        #[serde(
            default,
            rename = "finishedAt",
            skip_serializing_if = "Option::is_none"
        )]
        finished_at: Option<u64>,
    },
    /// Attach an entrant to a race.
    Link {
        /// Race receiving the entrant.
        #[serde(rename = "raceId")]
        race_id: Uuid,
        /// Entrant joining the race.
        #[serde(rename = "entrantId")]
        entrant_id: Uuid,
    },
}

/// Version reached by a race after a committed batch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommittedRace {
    /// Race touched by the batch.
    pub id: Uuid,
    /// Its version after the batch.
    pub version: u64,
}

/// Acknowledgement of a committed batch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactResponse {
    /// Races whose subscribers were notified.
    pub races: Vec<CommittedRace>,
}

impl From<TxOpInput> for TxOp {
    fn from(value: TxOpInput) -> Self {
        match value {
            TxOpInput::UpdateRace {
                id,
                text,
                started_at,
            } => TxOp::UpdateRace {
                id,
                patch: RacePatch { text, started_at },
            },
            TxOpInput::UpdateEntrant {
                id,
                name,
                team,
                progress,
                finished_at,
            } => TxOp::UpdateEntrant {
                id,
                patch: EntrantPatch {
                    name,
                    team,
                    progress,
                    finished_at,
                },
            },
            TxOpInput::Link {
                race_id,
                entrant_id,
            } => TxOp::Link {
                race_id,
                entrant_id,
            },
        }
    }
}

impl From<TxOp> for TxOpInput {
    fn from(value: TxOp) -> Self {
        match value {
            TxOp::UpdateRace { id, patch } => TxOpInput::UpdateRace {
                id,
                text: patch.text,
                started_at: patch.started_at,
            },
            TxOp::UpdateEntrant { id, patch } => TxOpInput::UpdateEntrant {
                id,
                name: patch.name,
                team: patch.team,
                progress: patch.progress,
                finished_at: patch.finished_at,
            },
            TxOp::Link {
                race_id,
                entrant_id,
            } => TxOpInput::Link {
                race_id,
                entrant_id,
            },
        }
    }
}

impl From<TransactRequest> for Transaction {
    fn from(value: TransactRequest) -> Self {
        value
            .ops
            .into_iter()
            .map(TxOp::from)
            .collect::<Vec<_>>()
            .into()
    }
}

impl From<Transaction> for TransactRequest {
    fn from(value: Transaction) -> Self {
        Self {
            ops: value.into_ops().into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use validator::Validate;

    use super::*;

    #[test]
    fn team_update_carries_only_the_team() {
        let entrant_id = Uuid::new_v4();
        let tx = Transaction::new().update_entrant(
            entrant_id,
            EntrantPatch {
                team: Some("Red".into()),
                ..EntrantPatch::default()
            },
        );
        let value = serde_json::to_value(TransactRequest::from(tx)).unwrap();
        assert_eq!(
            value,
            json!({ "ops": [{ "op": "update_entrant", "id": entrant_id, "team": "Red" }] })
        );
    }

    #[test]
    fn link_and_start_decode_from_camel_case() {
        let race_id = Uuid::new_v4();
        let entrant_id = Uuid::new_v4();
        let request: TransactRequest = serde_json::from_value(json!({
            "ops": [
                { "op": "link", "raceId": race_id, "entrantId": entrant_id },
                { "op": "update_race", "id": race_id, "startedAt": 1234 }
            ]
        }))
        .unwrap();

        let tx: Transaction = request.into();
        assert_eq!(
            tx.ops(),
            &[
                TxOp::Link {
                    race_id,
                    entrant_id
                },
                TxOp::UpdateRace {
                    id: race_id,
                    patch: RacePatch {
                        text: None,
                        started_at: Some(1234)
                    }
                }
            ]
        );
    }

    #[test]
    fn empty_batches_fail_validation() {
        let request = TransactRequest { ops: vec![] };
        assert!(request.validate().is_err());
    }
}
