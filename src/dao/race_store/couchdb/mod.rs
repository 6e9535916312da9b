//! CouchDB-backed race store.

mod config;
mod error;
mod models;
mod store;

pub use config::CouchConfig;
pub use error::CouchDaoError;
pub use store::CouchRaceStore;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::InvalidDocId {
                kind,
                doc_id,
                reason,
            } => StorageError::Corrupt {
                kind,
                id: doc_id,
                reason: reason.to_owned(),
            },
            other => StorageError::unavailable("couchdb", other),
        }
    }
}
