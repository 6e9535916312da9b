//! Race Store operations: creation, reads, subscriptions and atomic batches.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        race::RaceSnapshot,
        transact::{CommittedRace, TransactResponse},
    },
    error::ServiceError,
    state::{
        SharedState,
        hub::RaceSubscription,
        race::{Entrant, Race},
        transaction::{RaceAggregate, RacePatch, Transaction},
    },
};

/// Open a new race. A configured paragraph is used when `text` is absent.
pub async fn create_race(
    state: &SharedState,
    text: Option<String>,
) -> Result<RaceSnapshot, ServiceError> {
    let race_id = Uuid::new_v4();
    let text = text.unwrap_or_else(|| state.config().pick_paragraph());
    let tx = Transaction::new().update_race(
        race_id,
        RacePatch {
            text: Some(text),
            started_at: None,
        },
    );

    commit(state, tx).await?;
    info!(race_id = %race_id, "race created");
    get_race(state, race_id).await
}

/// Current snapshot of a race.
pub async fn get_race(state: &SharedState, race_id: Uuid) -> Result<RaceSnapshot, ServiceError> {
    ensure_loaded(state, race_id).await;
    let table = state.table().read().await;
    table
        .aggregate(&race_id)
        .map(RaceSnapshot::from)
        .ok_or(ServiceError::RaceNotFound(race_id))
}

/// Register a subscriber and return it with the snapshot it starts from.
///
/// The snapshot is `None` when the race does not exist yet; the first commit
/// touching it will reach the subscriber.
pub async fn subscribe(
    state: &SharedState,
    race_id: Uuid,
) -> (RaceSubscription, Option<RaceSnapshot>) {
    ensure_loaded(state, race_id).await;
    // Holding the read guard keeps commits out until the receiver exists.
    let table = state.table().read().await;
    let receiver = state.hubs().subscribe(race_id);
    let current = table.aggregate(&race_id).map(RaceSnapshot::from);
    (receiver, current)
}

/// Apply a batch atomically, notify subscribers and queue persistence.
pub async fn transact(
    state: &SharedState,
    tx: Transaction,
) -> Result<TransactResponse, ServiceError> {
    for race_id in tx.race_ids() {
        ensure_loaded(state, race_id).await;
    }
    commit(state, tx).await
}

async fn commit(state: &SharedState, tx: Transaction) -> Result<TransactResponse, ServiceError> {
    let now = state.now_ms();
    let snapshots = {
        let mut table = state.table().write().await;
        let commit = table.apply(tx, now)?;
        let snapshots = commit
            .races
            .iter()
            .filter_map(|race| table.aggregate(&race.id))
            .map(RaceSnapshot::from)
            .collect::<Vec<_>>();
        // Broadcast and queue under the write guard so hubs and the
        // persistence writer see versions in order.
        for snapshot in &snapshots {
            state.hubs().broadcast(snapshot.clone());
        }
        debug!(
            races = snapshots.len(),
            entrants = commit.entrants.len(),
            "batch committed"
        );
        state.queue_persistence(commit);
        snapshots
    };

    let response = TransactResponse {
        races: snapshots
            .iter()
            .map(|snapshot| CommittedRace {
                id: snapshot.race.id,
                version: snapshot.version,
            })
            .collect(),
    };
    Ok(response)
}

/// Hydrate a race and its entrants from the installed store when it is not in
/// memory yet. Storage failures are logged; the in-memory table keeps serving.
async fn ensure_loaded(state: &SharedState, race_id: Uuid) {
    if state.table().read().await.contains_race(&race_id) {
        return;
    }
    let Some(store) = state.race_store().await else {
        return;
    };

    let race = match store.find_race(race_id).await {
        Ok(Some(race)) => race,
        Ok(None) => return,
        Err(err) => {
            warn!(race_id = %race_id, error = %err, "failed to load race from storage");
            return;
        }
    };
    let entrants = match store.find_entrants(race_id).await {
        Ok(entrants) => entrants,
        Err(err) => {
            warn!(race_id = %race_id, error = %err, "failed to load entrants from storage");
            return;
        }
    };

    let race = Race::from(race);
    let entrants = race
        .entrant_ids
        .iter()
        .filter_map(|id| entrants.iter().find(|entrant| entrant.id == *id))
        .cloned()
        .map(Entrant::from)
        .collect();

    state
        .table()
        .write()
        .await
        .hydrate(RaceAggregate { race, entrants });
    debug!(race_id = %race_id, "race hydrated from storage");
}
