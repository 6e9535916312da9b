//! Process-local race store. Default backend and test double.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{EntrantEntity, RaceEntity},
    race_store::RaceStore,
    storage::StorageResult,
};

/// Race store keeping every record in memory. Records vanish with the process.
#[derive(Clone, Default)]
pub struct MemoryRaceStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    races: DashMap<Uuid, RaceEntity>,
    entrants: DashMap<Uuid, EntrantEntity>,
}

impl MemoryRaceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RaceStore for MemoryRaceStore {
    fn save_race(&self, race: RaceEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.races.insert(race.id, race);
            Ok(())
        })
    }

    fn save_entrant(&self, entrant: EntrantEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.entrants.insert(entrant.id, entrant);
            Ok(())
        })
    }

    fn find_race(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RaceEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.races.get(&id).map(|entry| entry.clone())) })
    }

    fn find_entrants(&self, race_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<EntrantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .entrants
                .iter()
                .filter(|entry| entry.race_id == Some(race_id))
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finds_entrants_by_race() {
        let store = MemoryRaceStore::new();
        let race_id = Uuid::new_v4();
        let entrant = |race_id| EntrantEntity {
            id: Uuid::new_v4(),
            race_id,
            name: "Ada".into(),
            team: String::new(),
            progress: 0.0,
            finished_at: None,
        };

        store.save_entrant(entrant(Some(race_id))).await.unwrap();
        store.save_entrant(entrant(None)).await.unwrap();
        store
            .save_entrant(entrant(Some(Uuid::new_v4())))
            .await
            .unwrap();

        let found = store.find_entrants(race_id).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].race_id, Some(race_id));
    }

    #[tokio::test]
    async fn saving_a_race_overwrites_previous_version() {
        let store = MemoryRaceStore::new();
        let mut race = RaceEntity {
            id: Uuid::new_v4(),
            text: "abc".into(),
            started_at: None,
            created_at: 1,
            entrant_ids: vec![],
            version: 1,
        };
        store.save_race(race.clone()).await.unwrap();
        race.version = 2;
        race.started_at = Some(10);
        store.save_race(race.clone()).await.unwrap();

        assert_eq!(store.find_race(race.id).await.unwrap(), Some(race));
    }
}
