//! Per-race participant identity and cached profile, kept in a [`LocalStore`].

use std::sync::Arc;

use indexmap::IndexSet;
use tracing::warn;
use uuid::Uuid;

use super::local_store::{LocalResult, LocalStore};

const NAME_KEY: &str = "name";
const TEAM_KEY: &str = "team";
const OWNED_RACES_KEY: &str = "ownedRaceIds";

fn entrant_key(race_id: Uuid) -> String {
    format!("entrantId-{race_id}")
}

/// Participant-local facts: who I am in each race, my last name and team,
/// and which races I created.
#[derive(Clone)]
pub struct ParticipantIdentity {
    store: Arc<dyn LocalStore>,
}

impl ParticipantIdentity {
    /// Identity persisted in `store`.
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Entrant id for `race_id`, generated and stored on first use.
    pub fn entrant_id(&self, race_id: Uuid) -> LocalResult<Uuid> {
        let key = entrant_key(race_id);
        if let Some(raw) = self.store.get(&key)? {
            match Uuid::parse_str(&raw) {
                Ok(id) => return Ok(id),
                Err(err) => warn!(key = %key, error = %err, "replacing malformed entrant id"),
            }
        }

        let id = Uuid::new_v4();
        self.store.set(&key, &id.to_string())?;
        Ok(id)
    }

    /// Cached display name, shared by every race.
    pub fn name(&self) -> LocalResult<String> {
        Ok(self.store.get(NAME_KEY)?.unwrap_or_default())
    }

    /// Replace the cached display name.
    pub fn set_name(&self, name: &str) -> LocalResult<()> {
        self.store.set(NAME_KEY, name)
    }

    /// Cached team label, shared by every race.
    pub fn team(&self) -> LocalResult<String> {
        Ok(self.store.get(TEAM_KEY)?.unwrap_or_default())
    }

    /// Replace the cached team label.
    pub fn set_team(&self, team: &str) -> LocalResult<()> {
        self.store.set(TEAM_KEY, team)
    }

    /// Whether this participant created `race_id`. Not verified anywhere else.
    pub fn is_owner(&self, race_id: Uuid) -> LocalResult<bool> {
        Ok(self.owned_races()?.contains(&race_id))
    }

    /// Remember `race_id` as created by this participant.
    pub fn mark_owned(&self, race_id: Uuid) -> LocalResult<()> {
        let mut owned = self.owned_races()?;
        if owned.insert(race_id) {
            let encoded = serde_json::to_string(&owned).unwrap_or_else(|_| "[]".to_owned());
            self.store.set(OWNED_RACES_KEY, &encoded)?;
        }
        Ok(())
    }

    fn owned_races(&self) -> LocalResult<IndexSet<Uuid>> {
        let Some(raw) = self.store.get(OWNED_RACES_KEY)? else {
            return Ok(IndexSet::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(error = %err, "ignoring malformed owned race list");
            IndexSet::new()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::local_store::MemoryLocalStore;

    fn identity() -> (Arc<MemoryLocalStore>, ParticipantIdentity) {
        let store = Arc::new(MemoryLocalStore::new());
        (store.clone(), ParticipantIdentity::new(store))
    }

    #[test]
    fn entrant_id_is_reused_per_race() {
        let (store, identity) = identity();
        let race = Uuid::new_v4();

        let first = identity.entrant_id(race).unwrap();
        let second = identity.entrant_id(race).unwrap();
        assert_eq!(first, second);
        assert_ne!(identity.entrant_id(Uuid::new_v4()).unwrap(), first);
        assert_eq!(
            store.get(&format!("entrantId-{race}")).unwrap(),
            Some(first.to_string())
        );
    }

    #[test]
    fn malformed_entrant_id_is_replaced() {
        let (store, identity) = identity();
        let race = Uuid::new_v4();
        store.set(&entrant_key(race), "garbage").unwrap();

        let id = identity.entrant_id(race).unwrap();
        assert_eq!(identity.entrant_id(race).unwrap(), id);
    }

    #[test]
    fn ownership_is_local_and_cumulative() {
        let (store, identity) = identity();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        assert!(!identity.is_owner(first).unwrap());

        identity.mark_owned(first).unwrap();
        identity.mark_owned(second).unwrap();
        identity.mark_owned(first).unwrap();

        assert!(identity.is_owner(first).unwrap());
        assert!(identity.is_owner(second).unwrap());
        let stored: Vec<Uuid> =
            serde_json::from_str(&store.get(OWNED_RACES_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, vec![first, second]);
    }

    #[test]
    fn profile_defaults_to_empty() {
        let (_, identity) = identity();
        assert_eq!(identity.name().unwrap(), "");
        identity.set_team("Green").unwrap();
        assert_eq!(identity.team().unwrap(), "Green");
    }
}
