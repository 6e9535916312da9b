//! Error types raised by the CouchDB race store.

use reqwest::{Method, StatusCode};
use thiserror::Error;

use crate::dao::storage::RecordKind;

/// Convenient result alias returning [`CouchDaoError`] failures.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures that can occur while interacting with CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// A required `COUCH_*` variable is unset.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// The HTTP client could not be built.
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The request never got an answer, or the answer body was cut short.
    #[error("CouchDB request `{method} {path}` failed")]
    Transport {
        /// HTTP method of the request.
        method: Method,
        /// Path below the server URL.
        path: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB answered with a status the call does not accept.
    #[error("CouchDB answered {status} to `{method} {path}`")]
    Status {
        /// HTTP method of the request.
        method: Method,
        /// Path below the server URL.
        path: String,
        /// Status received.
        status: StatusCode,
    },
    /// The response body is not the expected JSON.
    #[error("cannot decode CouchDB body of `{path}`")]
    Decode {
        /// Path below the server URL.
        path: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// A document ID does not carry the expected prefix and UUID.
    #[error("invalid {kind} document ID `{doc_id}`: {reason}")]
    InvalidDocId {
        /// Kind of record the document holds.
        kind: RecordKind,
        /// Offending `_id`.
        doc_id: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}
