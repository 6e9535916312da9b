//! Write-behind persistence of committed batches.

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    dao::{
        race_store::RaceStore,
        storage::{RecordKind, StorageError},
    },
    state::{SharedState, transaction::Commit},
};

/// Drain the persistence queue, writing each commit to the installed store in
/// commit order. Commits arriving while no store is installed are dropped.
pub async fn run(state: SharedState) {
    let Some(mut queue) = state.take_persistence_queue().await else {
        warn!("persistence writer already running");
        return;
    };

    while let Some(commit) = queue.recv().await {
        match state.race_store().await {
            Some(store) => persist(store.as_ref(), commit).await,
            None => debug!("no storage installed; skipping commit"),
        }
    }
}

/// Write the records of one commit. Entrants go first so a stored race never
/// lists an entrant that is missing from storage.
pub async fn persist(store: &dyn RaceStore, commit: Commit) {
    for entrant in commit.entrants {
        let entrant_id = entrant.id;
        if let Err(err) = store.save_entrant(entrant.into()).await {
            report(RecordKind::Entrant, entrant_id, &err);
        }
    }
    for race in commit.races {
        let race_id = race.id;
        if let Err(err) = store.save_race(race.into()).await {
            report(RecordKind::Race, race_id, &err);
        }
    }
}

fn report(kind: RecordKind, id: Uuid, err: &StorageError) {
    if err.is_transient() {
        warn!(%kind, id = %id, error = %err, "failed to persist record");
    } else {
        error!(%kind, id = %id, error = %err, "record rejected by storage");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::race_store::memory::MemoryRaceStore,
        services::race_service,
        state::{
            AppState,
            transaction::{EntrantPatch, Transaction},
        },
    };

    #[tokio::test]
    async fn commits_reach_the_installed_store() {
        let state = AppState::new(AppConfig::default());
        let store = MemoryRaceStore::new();
        state.install_race_store(Arc::new(store.clone())).await;
        let writer = tokio::spawn(run(state.clone()));

        let race = race_service::create_race(&state, Some("text".into()))
            .await
            .unwrap();
        let entrant_id = Uuid::new_v4();
        race_service::transact(
            &state,
            Transaction::new()
                .update_entrant(
                    entrant_id,
                    EntrantPatch {
                        name: Some("Ada".into()),
                        ..EntrantPatch::default()
                    },
                )
                .link(race.race.id, entrant_id),
        )
        .await
        .unwrap();

        let mut stored = None;
        for _ in 0..50 {
            stored = store.find_race(race.race.id).await.unwrap();
            if stored.as_ref().is_some_and(|race| race.version == 2) {
                break;
            }
            tokio::task::yield_now().await;
        }
        let stored = stored.unwrap();
        assert_eq!(stored.entrant_ids, vec![entrant_id]);
        let entrants = store.find_entrants(race.race.id).await.unwrap();
        assert_eq!(entrants[0].name, "Ada");

        writer.abort();
    }
}
