//! Backend-neutral storage errors.

use std::{error::Error, fmt};

use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Kind of record a storage failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A race record.
    Race,
    /// An entrant record.
    Entrant,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Race => "race",
            RecordKind::Entrant => "entrant",
        })
    }
}

/// Error raised by race stores regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or refused the operation.
    #[error("{backend} unavailable: {message}")]
    Unavailable {
        /// Backend name, as selected by `STORE_BACKEND`.
        backend: &'static str,
        /// Rendered cause.
        message: String,
        /// Backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A stored document could not be mapped back to a record.
    #[error("corrupt {kind} record `{id}`: {reason}")]
    Corrupt {
        /// Kind of record.
        kind: RecordKind,
        /// Stored identifier.
        id: String,
        /// What could not be mapped.
        reason: String,
    },
}

impl StorageError {
    /// Wrap a backend failure, keeping its message for logs.
    pub fn unavailable(backend: &'static str, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            backend,
            message: source.to_string(),
            source: Box::new(source),
        }
    }

    /// Whether retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn unavailable_keeps_backend_and_source_message() {
        let err = StorageError::unavailable("mongodb", io::Error::other("connection reset"));
        assert_eq!(err.to_string(), "mongodb unavailable: connection reset");
        assert!(err.is_transient());
        assert!(err.source().is_some());
    }

    #[test]
    fn corrupt_records_are_not_transient() {
        let err = StorageError::Corrupt {
            kind: RecordKind::Entrant,
            id: "entrant::nope".into(),
            reason: "not a uuid".into(),
        };
        assert_eq!(
            err.to_string(),
            "corrupt entrant record `entrant::nope`: not a uuid"
        );
        assert!(!err.is_transient());
    }
}
