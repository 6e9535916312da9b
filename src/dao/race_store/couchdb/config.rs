//! CouchDB connection settings read from the environment.

use std::env;

use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DATABASE: &str = "typerace";

/// Basic-auth pair sent with every request.
#[derive(Debug, Clone)]
pub struct CouchCredentials {
    /// `COUCH_USERNAME`.
    pub username: String,
    /// `COUCH_PASSWORD`.
    pub password: String,
}

/// Server and database holding race and entrant documents.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    base_url: String,
    database: String,
    credentials: Option<CouchCredentials>,
}

impl CouchConfig {
    /// Anonymous access to `database` on `base_url`.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            database: database.into(),
            credentials: None,
        }
    }

    /// Authenticate every request with basic auth.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(CouchCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Read `COUCH_BASE_URL` (required), `COUCH_DB` (defaults to `typerace`)
    /// and the `COUCH_USERNAME`/`COUCH_PASSWORD` pair, used only when both
    /// are set.
    pub fn from_env() -> CouchResult<Self> {
        let base_url = env::var("COUCH_BASE_URL").map_err(|_| CouchDaoError::MissingEnvVar {
            var: "COUCH_BASE_URL",
        })?;
        let database = env::var("COUCH_DB").unwrap_or_else(|_| DEFAULT_DATABASE.to_owned());

        let config = Self::new(base_url, database);
        Ok(
            match (env::var("COUCH_USERNAME"), env::var("COUCH_PASSWORD")) {
                (Ok(username), Ok(password)) => config.with_credentials(username, password),
                _ => config,
            },
        )
    }

    /// Database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Basic-auth pair, when configured.
    pub fn credentials(&self) -> Option<&CouchCredentials> {
        self.credentials.as_ref()
    }

    /// URL of the database itself.
    pub fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    /// URL of a document or endpoint inside the database.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.database_url(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_ignore_trailing_slash() {
        let config = CouchConfig::new("http://couch:5984/", "races");
        assert_eq!(config.database_url(), "http://couch:5984/races");
        assert_eq!(config.url_for("_all_docs"), "http://couch:5984/races/_all_docs");
        assert!(config.credentials().is_none());
    }
}
