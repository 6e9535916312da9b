//! MongoDB store errors.

use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::storage::RecordKind;

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// `MONGO_URI` could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// URI as configured.
        uri: String,
        /// Underlying driver error.
        #[source]
        source: MongoError,
    },
    /// The driver refused the parsed options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Underlying driver error.
        #[source]
        source: MongoError,
    },
    /// The server never answered a ping while connecting.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings tried.
        attempts: u32,
        /// Underlying driver error.
        #[source]
        source: MongoError,
    },
    /// A periodic ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Underlying driver error.
        #[source]
        source: MongoError,
    },
    /// An index could not be created.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection name.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Underlying driver error.
        #[source]
        source: MongoError,
    },
    /// Upserting a race document failed.
    #[error("failed to save race `{id}`")]
    SaveRace {
        /// Race being saved.
        id: Uuid,
        /// Underlying driver error.
        #[source]
        source: MongoError,
    },
    /// Upserting an entrant document failed.
    #[error("failed to save entrant `{id}`")]
    SaveEntrant {
        /// Entrant being saved.
        id: Uuid,
        /// Underlying driver error.
        #[source]
        source: MongoError,
    },
    /// Reading a race document failed.
    #[error("failed to load race `{id}`")]
    LoadRace {
        /// Race being loaded.
        id: Uuid,
        /// Underlying driver error.
        #[source]
        source: MongoError,
    },
    /// Reading the entrants of a race failed.
    #[error("failed to load entrants of race `{race_id}`")]
    LoadEntrants {
        /// Race whose entrants were requested.
        race_id: Uuid,
        /// Underlying driver error.
        #[source]
        source: MongoError,
    },
    /// A stored `_id` is not a UUID.
    #[error("stored {kind} document holds invalid identifier `{id}`")]
    InvalidId {
        /// Kind of record the document holds.
        kind: RecordKind,
        /// Offending identifier.
        id: String,
    },
}
