//! HTTP calls against a CouchDB database.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::info;
use uuid::Uuid;

use crate::dao::{
    models::{EntrantEntity, RaceEntity},
    race_store::RaceStore,
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsKeys, AllDocsResponse, CouchEntrantDocument, CouchRaceDocument, entrant_doc_id,
        race_doc_id,
    },
};

const ALL_DOCS: &str = "_all_docs";

/// Race store keeping one CouchDB document per race and per entrant.
#[derive(Clone)]
pub struct CouchRaceStore {
    client: Client,
    config: Arc<CouchConfig>,
}

impl CouchRaceStore {
    /// Build the HTTP client and create the database when missing.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;
        let store = Self {
            client,
            config: Arc::new(config),
        };
        store.ensure_database().await?;
        Ok(store)
    }

    /// Request on the database itself (`path` empty) or on a path inside it.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = if path.is_empty() {
            self.config.database_url()
        } else {
            self.config.url_for(path)
        };
        let builder = self.client.request(method, url);
        match self.config.credentials() {
            Some(credentials) => {
                builder.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => builder,
        }
    }

    async fn send(&self, method: Method, path: &str, builder: RequestBuilder) -> CouchResult<Response> {
        builder
            .send()
            .await
            .map_err(|source| CouchDaoError::Transport {
                method,
                path: path.to_owned(),
                source,
            })
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let response = self
            .send(Method::HEAD, "", self.request(Method::HEAD, ""))
            .await?;
        match response.status() {
            status if status.is_success() => return Ok(()),
            StatusCode::NOT_FOUND => {}
            status => return Err(status_error(Method::HEAD, self.config.database(), status)),
        }

        let created = self
            .send(Method::PUT, "", self.request(Method::PUT, ""))
            .await?;
        match created.status() {
            // 412: created concurrently by another instance.
            status if status.is_success() || status == StatusCode::PRECONDITION_FAILED => {
                info!(database = self.config.database(), "CouchDB database created");
                Ok(())
            }
            status => Err(status_error(Method::PUT, self.config.database(), status)),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .send(Method::GET, doc_id, self.request(Method::GET, doc_id))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => decode(Method::GET, doc_id, response).await.map(Some),
            status => Err(status_error(Method::GET, doc_id, status)),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: Serialize,
    {
        let builder = self.request(Method::PUT, doc_id).json(document);
        let response = self.send(Method::PUT, doc_id, builder).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            status => Err(status_error(Method::PUT, doc_id, status)),
        }
    }

    /// Fetch several documents by ID in one round-trip. Unknown IDs are skipped.
    async fn fetch_documents<T>(&self, doc_ids: Vec<String>) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        if doc_ids.is_empty() {
            return Ok(Vec::new());
        }

        let builder = self
            .request(Method::POST, ALL_DOCS)
            .query(&[("include_docs", "true")])
            .json(&AllDocsKeys { keys: doc_ids });
        let response = self.send(Method::POST, ALL_DOCS, builder).await?;
        if !response.status().is_success() {
            return Err(status_error(Method::POST, ALL_DOCS, response.status()));
        }

        let payload: AllDocsResponse = decode(Method::POST, ALL_DOCS, response).await?;
        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .filter(|doc| !doc.is_null())
            .map(|doc| {
                serde_json::from_value(doc).map_err(|source| CouchDaoError::Decode {
                    path: ALL_DOCS.to_owned(),
                    source,
                })
            })
            .collect()
    }

    /// Current revision of a document, needed to overwrite it.
    async fn current_rev(&self, doc_id: &str) -> CouchResult<Option<String>> {
        let response = self
            .send(Method::HEAD, doc_id, self.request(Method::HEAD, doc_id))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(response
                .headers()
                .get(reqwest::header::ETAG)
                .and_then(|etag| etag.to_str().ok())
                .map(|etag| etag.trim_matches('"').to_owned())),
            status => Err(status_error(Method::HEAD, doc_id, status)),
        }
    }

    async fn save_race(&self, race: RaceEntity) -> CouchResult<()> {
        let doc_id = race_doc_id(race.id);
        let mut document = CouchRaceDocument::from_entity(race);
        document.rev = self.current_rev(&doc_id).await?;
        self.put_document(&doc_id, &document).await
    }

    async fn save_entrant(&self, entrant: EntrantEntity) -> CouchResult<()> {
        let doc_id = entrant_doc_id(entrant.id);
        let mut document = CouchEntrantDocument::from_entity(entrant);
        document.rev = self.current_rev(&doc_id).await?;
        self.put_document(&doc_id, &document).await
    }

    async fn find_race(&self, id: Uuid) -> CouchResult<Option<RaceEntity>> {
        self.get_document::<CouchRaceDocument>(&race_doc_id(id))
            .await?
            .map(CouchRaceDocument::try_into_entity)
            .transpose()
    }

    /// Entrants are looked up through the race document's ID list.
    async fn find_entrants(&self, race_id: Uuid) -> CouchResult<Vec<EntrantEntity>> {
        let Some(race) = self.find_race(race_id).await? else {
            return Ok(Vec::new());
        };

        let doc_ids = race.entrant_ids.iter().copied().map(entrant_doc_id).collect();
        let documents = self
            .fetch_documents::<CouchEntrantDocument>(doc_ids)
            .await?;

        documents
            .into_iter()
            .map(CouchEntrantDocument::try_into_entity)
            .filter(|entrant| {
                entrant
                    .as_ref()
                    .map_or(true, |entrant| entrant.race_id == Some(race_id))
            })
            .collect()
    }

    async fn health_check(&self) -> CouchResult<()> {
        let response = self
            .send(Method::HEAD, "", self.request(Method::HEAD, ""))
            .await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            status => Err(status_error(Method::HEAD, self.config.database(), status)),
        }
    }
}

fn status_error(method: Method, path: &str, status: StatusCode) -> CouchDaoError {
    CouchDaoError::Status {
        method,
        path: path.to_owned(),
        status,
    }
}

async fn decode<T>(method: Method, path: &str, response: Response) -> CouchResult<T>
where
    T: DeserializeOwned,
{
    let body = response
        .bytes()
        .await
        .map_err(|source| CouchDaoError::Transport {
            method,
            path: path.to_owned(),
            source,
        })?;
    serde_json::from_slice(&body).map_err(|source| CouchDaoError::Decode {
        path: path.to_owned(),
        source,
    })
}

impl RaceStore for CouchRaceStore {
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
        Box::pin(async move { store.health_check().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
