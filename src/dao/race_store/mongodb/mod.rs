//! MongoDB-backed race store.

mod config;
mod connection;
mod error;
mod models;
mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoRaceStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::InvalidId { kind, id } => StorageError::Corrupt {
                kind,
                id,
                reason: "identifier is not a UUID".to_owned(),
            },
            other => StorageError::unavailable("mongodb", other),
        }
    }
}
