//! Collection access for races and entrants.

use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, IndexModel, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::{open_database, ping},
    error::{MongoDaoError, MongoResult},
    models::{MongoEntrantDocument, MongoRaceDocument, by_race, doc_id},
};
use crate::dao::{
    models::{EntrantEntity, RaceEntity},
    race_store::RaceStore,
    storage::StorageResult,
};

const RACE_COLLECTION_NAME: &str = "races";
const ENTRANT_COLLECTION_NAME: &str = "entrants";

/// Race store persisting races and entrants in two MongoDB collections.
#[derive(Clone)]
pub struct MongoRaceStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        ping(&database)
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = open_database(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoRaceStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = open_database(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let entrants = self.entrant_collection().await;
        let index = IndexModel::builder()
            .keys(doc! { "race_id": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("entrant_race_idx".to_owned()))
                    .build(),
            )
            .build();

        entrants
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ENTRANT_COLLECTION_NAME,
                index: "race_id",
                source,
            })?;

        Ok(())
    }

    async fn race_collection(&self) -> Collection<MongoRaceDocument> {
        let guard = self.inner.state.read().await;
        guard.database.collection(RACE_COLLECTION_NAME)
    }

    async fn entrant_collection(&self) -> Collection<MongoEntrantDocument> {
        let guard = self.inner.state.read().await;
        guard.database.collection(ENTRANT_COLLECTION_NAME)
    }

    async fn save_race(&self, race: RaceEntity) -> MongoResult<()> {
        let id = race.id;
        let document = MongoRaceDocument::from(race);
        self.race_collection()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveRace { id, source })?;
        debug!(race_id = %id, "race document saved");
        Ok(())
    }

    async fn save_entrant(&self, entrant: EntrantEntity) -> MongoResult<()> {
        let id = entrant.id;
        let document = MongoEntrantDocument::from(entrant);
        self.entrant_collection()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveEntrant { id, source })?;
        Ok(())
    }

    async fn find_race(&self, id: Uuid) -> MongoResult<Option<RaceEntity>> {
        let document = self
            .race_collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadRace { id, source })?;

        document.map(RaceEntity::try_from).transpose()
    }

    async fn find_entrants(&self, race_id: Uuid) -> MongoResult<Vec<EntrantEntity>> {
        let documents: Vec<MongoEntrantDocument> = self
            .entrant_collection()
            .await
            .find(by_race(race_id))
            .await
            .map_err(|source| MongoDaoError::LoadEntrants { race_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadEntrants { race_id, source })?;

        documents
            .into_iter()
            .map(EntrantEntity::try_from)
            .collect()
    }
}

impl RaceStore for MongoRaceStore {
    fn save_race(&self, race: RaceEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_race(race).await.map_err(Into::into) })
    }

    fn save_entrant(&self, entrant: EntrantEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_entrant(entrant).await.map_err(Into::into) })
    }

    fn find_race(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RaceEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_race(id).await.map_err(Into::into) })
    }

    fn find_entrants(&self, race_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<EntrantEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_entrants(race_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
