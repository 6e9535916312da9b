//! MongoDB connection settings read from the environment.

use std::{env, time::Duration};

use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_URI: &str = "mongodb://localhost:27017";
const DEFAULT_DATABASE: &str = "typerace";
const APP_NAME: &str = "typerace";
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CONNECT_ATTEMPTS: u32 = 10;

/// Where the race collections live and how hard to try reaching them.
#[derive(Clone)]
pub struct MongoConfig {
    /// Driver options parsed from the URI.
    pub options: ClientOptions,
    /// Database holding the `races` and `entrants` collections.
    pub database_name: String,
    /// Pings tried before [`MongoRaceStore::connect`](super::MongoRaceStore::connect) gives up.
    pub connect_attempts: u32,
}

impl MongoConfig {
    /// Parse a connection URI. The database defaults to `typerace`; the
    /// application name and a short server selection timeout are filled in
    /// unless the URI sets them.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let mut options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;
        options.app_name.get_or_insert_with(|| APP_NAME.to_owned());
        options
            .server_selection_timeout
            .get_or_insert(SERVER_SELECTION_TIMEOUT);

        Ok(Self {
            options,
            database_name: db_name.unwrap_or(DEFAULT_DATABASE).to_owned(),
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
        })
    }

    /// Read `MONGO_URI` (local server by default), `MONGO_DB` and
    /// `MONGO_CONNECT_ATTEMPTS`.
    pub async fn from_env() -> MongoResult<Self> {
        let uri = env::var("MONGO_URI").unwrap_or_else(|_| DEFAULT_URI.to_owned());
        let db = env::var("MONGO_DB").ok();
        let mut config = Self::from_uri(&uri, db.as_deref()).await?;
        if let Some(attempts) = env::var("MONGO_CONNECT_ATTEMPTS")
            .ok()
            .and_then(|raw| raw.parse::<u32>().ok())
            .filter(|attempts| *attempts > 0)
        {
            config.connect_attempts = attempts;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uri_defaults_are_filled_in() {
        let config = MongoConfig::from_uri("mongodb://db.internal:27017", None)
            .await
            .unwrap();
        assert_eq!(config.database_name, "typerace");
        assert_eq!(config.options.app_name.as_deref(), Some("typerace"));
        assert_eq!(
            config.options.server_selection_timeout,
            Some(SERVER_SELECTION_TIMEOUT)
        );
        assert_eq!(config.connect_attempts, DEFAULT_CONNECT_ATTEMPTS);
    }

    #[tokio::test]
    async fn uri_settings_win_over_defaults() {
        let config = MongoConfig::from_uri(
            "mongodb://db.internal:27017/?appName=grader&serverSelectionTimeoutMS=250",
            Some("races"),
        )
        .await
        .unwrap();
        assert_eq!(config.database_name, "races");
        assert_eq!(config.options.app_name.as_deref(), Some("grader"));
        assert_eq!(
            config.options.server_selection_timeout,
            Some(Duration::from_millis(250))
        );
    }

    #[tokio::test]
    async fn malformed_uri_is_rejected() {
        let err = MongoConfig::from_uri("postgres://nope", None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, MongoDaoError::InvalidUri { .. }));
    }
}
