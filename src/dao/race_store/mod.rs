//! Durable storage of races and entrants.

#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{EntrantEntity, RaceEntity},
    storage::StorageResult,
};

/// Abstraction over the persistence layer for races and their entrants.
pub trait RaceStore: Send + Sync {
    /// Insert or replace a race record.
    fn save_race(&self, race: RaceEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Insert or replace an entrant record.
    fn save_entrant(&self, entrant: EntrantEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Race record by id.
    fn find_race(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RaceEntity>>>;
    /// Entrants linked to `race_id`, in no particular order.
    fn find_entrants(&self, race_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<EntrantEntity>>>;
    /// Check the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
