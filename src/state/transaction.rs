//! Atomic write batches and the race table they apply to.

use std::collections::HashMap;

use indexmap::IndexSet;
use thiserror::Error;
use uuid::Uuid;

use crate::state::{
    lifecycle::{InvalidTransition, LifecycleEvent},
    race::{Entrant, Race},
};

/// Field-level update of a race. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RacePatch {
    /// New paragraph.
    pub text: Option<String>,
    /// Start timestamp; accepted only while the race is still waiting.
    pub started_at: Option<u64>,
}

/// Field-level update of an entrant. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntrantPatch {
    /// New display name.
    pub name: Option<String>,
    /// New team label.
    pub team: Option<String>,
    /// New progress value.
    pub progress: Option<f64>,
    /// New finish timestamp.
    pub finished_at: Option<u64>,
}

/// One operation inside a [`Transaction`].
#[derive(Debug, Clone, PartialEq)]
pub enum TxOp {
    /// Create or update a race.
    UpdateRace {
        /// Target race.
        id: Uuid,
        /// Fields to write.
        patch: RacePatch,
    },
    /// Create or update an entrant.
    UpdateEntrant {
        /// Target entrant.
        id: Uuid,
        /// Fields to write.
        patch: EntrantPatch,
    },
    /// Associate an entrant with a race.
    Link {
        /// Race receiving the entrant.
        race_id: Uuid,
        /// Entrant joining the race.
        entrant_id: Uuid,
    },
}

/// Ordered batch of operations applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    ops: Vec<TxOp>,
}

impl Transaction {
    /// Start an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a race update.
    pub fn update_race(mut self, id: Uuid, patch: RacePatch) -> Self {
        self.ops.push(TxOp::UpdateRace { id, patch });
        self
    }

    /// Append an entrant update.
    pub fn update_entrant(mut self, id: Uuid, patch: EntrantPatch) -> Self {
        self.ops.push(TxOp::UpdateEntrant { id, patch });
        self
    }

    /// Append a race/entrant link.
    pub fn link(mut self, race_id: Uuid, entrant_id: Uuid) -> Self {
        self.ops.push(TxOp::Link {
            race_id,
            entrant_id,
        });
        self
    }

    /// Operations in application order.
    pub fn ops(&self) -> &[TxOp] {
        &self.ops
    }

    /// Consume the batch, yielding its operations.
    pub fn into_ops(self) -> Vec<TxOp> {
        self.ops
    }

    /// Whether the batch holds no operation.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Races referenced directly by the batch, in first-seen order.
    pub fn race_ids(&self) -> Vec<Uuid> {
        let mut ids = IndexSet::new();
        for op in &self.ops {
            match op {
                TxOp::UpdateRace { id, .. } => {
                    ids.insert(*id);
                }
                TxOp::Link { race_id, .. } => {
                    ids.insert(*race_id);
                }
                TxOp::UpdateEntrant { .. } => {}
            }
        }
        ids.into_iter().collect()
    }
}

impl From<Vec<TxOp>> for Transaction {
    fn from(ops: Vec<TxOp>) -> Self {
        Self { ops }
    }
}

/// Reasons a batch is rejected. A rejected batch leaves the table untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransactError {
    /// The batch holds no operation.
    #[error("transaction contains no operations")]
    Empty,
    /// A link targets a race that does not exist.
    #[error("race `{0}` does not exist")]
    UnknownRace(Uuid),
    /// A link targets an entrant that does not exist.
    #[error("entrant `{0}` does not exist")]
    UnknownEntrant(Uuid),
    /// The entrant already belongs to another race.
    #[error("entrant `{entrant_id}` is already linked to race `{linked_to}`")]
    AlreadyLinked {
        /// Entrant being linked.
        entrant_id: Uuid,
        /// Race it currently belongs to.
        linked_to: Uuid,
    },
    /// The race lifecycle refused the update (start written twice).
    #[error(transparent)]
    Lifecycle(#[from] InvalidTransition),
}

/// A race together with its linked entrants in join order.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceAggregate {
    /// The race record.
    pub race: Race,
    /// Linked entrants, in join order.
    pub entrants: Vec<Entrant>,
}

/// Records written by a committed batch.
#[derive(Debug, Clone, Default)]
pub struct Commit {
    /// Races whose snapshot changed, with their new version.
    pub races: Vec<Race>,
    /// Entrants created or updated by the batch.
    pub entrants: Vec<Entrant>,
}

/// In-memory table of races and entrants.
#[derive(Debug, Default)]
pub struct RaceTable {
    races: HashMap<Uuid, Race>,
    entrants: HashMap<Uuid, Entrant>,
}

impl RaceTable {
    /// Look up a race.
    pub fn race(&self, id: &Uuid) -> Option<&Race> {
        self.races.get(id)
    }

    /// Look up an entrant.
    pub fn entrant(&self, id: &Uuid) -> Option<&Entrant> {
        self.entrants.get(id)
    }

    /// Number of races held.
    pub fn len(&self) -> usize {
        self.races.len()
    }

    /// Whether no race is held.
    pub fn is_empty(&self) -> bool {
        self.races.is_empty()
    }

    /// Whether the race is loaded.
    pub fn contains_race(&self, id: &Uuid) -> bool {
        self.races.contains_key(id)
    }

    /// Race plus linked entrants, if the race is loaded.
    pub fn aggregate(&self, race_id: &Uuid) -> Option<RaceAggregate> {
        let race = self.races.get(race_id)?.clone();
        let entrants = race
            .entrant_ids
            .iter()
            .filter_map(|id| self.entrants.get(id).cloned())
            .collect();
        Some(RaceAggregate { race, entrants })
    }

    /// Install records loaded from persistence. Records already in memory win.
    pub fn hydrate(&mut self, aggregate: RaceAggregate) {
        for entrant in aggregate.entrants {
            self.entrants.entry(entrant.id).or_insert(entrant);
        }
        self.races
            .entry(aggregate.race.id)
            .or_insert(aggregate.race);
    }

    /// Apply every operation of `tx` or none of them.
    pub fn apply(&mut self, tx: Transaction, now_ms: u64) -> Result<Commit, TransactError> {
        if tx.is_empty() {
            return Err(TransactError::Empty);
        }

        let mut staged_races: HashMap<Uuid, Race> = HashMap::new();
        let mut staged_entrants: HashMap<Uuid, Entrant> = HashMap::new();
        let mut affected: IndexSet<Uuid> = IndexSet::new();

        for op in tx.into_ops() {
            match op {
                TxOp::UpdateRace { id, patch } => {
                    let race = staged_races.entry(id).or_insert_with(|| {
                        self.races
                            .get(&id)
                            .cloned()
                            .unwrap_or_else(|| Race::new(id, String::new(), now_ms))
                    });
                    if let Some(text) = patch.text {
                        race.text = text;
                    }
                    if let Some(at) = patch.started_at {
                        let next = race.lifecycle().apply(LifecycleEvent::Start { at })?;
                        race.started_at = next.started_at();
                    }
                    affected.insert(id);
                }
                TxOp::UpdateEntrant { id, patch } => {
                    let entrant = staged_entrants.entry(id).or_insert_with(|| {
                        self.entrants
                            .get(&id)
                            .cloned()
                            .unwrap_or_else(|| Entrant::new(id))
                    });
                    if let Some(name) = patch.name {
                        entrant.name = name;
                    }
                    if let Some(team) = patch.team {
                        entrant.team = team;
                    }
                    if let Some(progress) = patch.progress {
                        entrant.progress = progress;
                    }
                    if let Some(finished_at) = patch.finished_at {
                        entrant.finished_at = Some(finished_at);
                    }
                    if let Some(race_id) = entrant.race_id {
                        affected.insert(race_id);
                    }
                }
                TxOp::Link {
                    race_id,
                    entrant_id,
                } => {
                    stage_existing(&self.races, &mut staged_races, race_id)
                        .ok_or(TransactError::UnknownRace(race_id))?;

                    let entrant = stage_existing(&self.entrants, &mut staged_entrants, entrant_id)
                        .ok_or(TransactError::UnknownEntrant(entrant_id))?;
                    match entrant.race_id {
                        Some(linked_to) if linked_to != race_id => {
                            return Err(TransactError::AlreadyLinked {
                                entrant_id,
                                linked_to,
                            });
                        }
                        _ => entrant.race_id = Some(race_id),
                    }

                    if let Some(race) = staged_races.get_mut(&race_id) {
                        race.entrant_ids.insert(entrant_id);
                    }
                    affected.insert(race_id);
                }
            }
        }

        let mut commit = Commit::default();
        for race_id in affected {
            let Some(mut race) = staged_races
                .remove(&race_id)
                .or_else(|| self.races.get(&race_id).cloned())
            else {
                continue;
            };
            race.version += 1;
            self.races.insert(race_id, race.clone());
            commit.races.push(race);
        }
        for (_, entrant) in staged_entrants {
            self.entrants.insert(entrant.id, entrant.clone());
            commit.entrants.push(entrant);
        }

        Ok(commit)
    }
}

/// Copy a record from the committed table into the staging area (if not
/// already staged) and hand back the staged copy.
fn stage_existing<'a, T: Clone>(
    table: &HashMap<Uuid, T>,
    staged: &'a mut HashMap<Uuid, T>,
    id: Uuid,
) -> Option<&'a mut T> {
    if !staged.contains_key(&id) {
        let record = table.get(&id)?.clone();
        staged.insert(id, record);
    }
    staged.get_mut(&id)
}
