//! MongoDB client construction and ping.

use std::time::Duration;

use mongodb::{Client, Database, bson::doc};
use tokio::time::sleep;
use tracing::debug;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

const FIRST_RETRY_DELAY: Duration = Duration::from_millis(250);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Open a client on the configured database and wait until it answers a
/// ping, retrying up to `config.connect_attempts` times.
pub async fn open_database(config: &MongoConfig) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    let mut delay = FIRST_RETRY_DELAY;
    for attempt in 1..=config.connect_attempts {
        match ping(&database).await {
            Ok(()) => return Ok((client, database)),
            Err(source) if attempt == config.connect_attempts => {
                return Err(MongoDaoError::InitialPing {
                    attempts: attempt,
                    source,
                });
            }
            Err(err) => {
                debug!(
                    database = %config.database_name,
                    attempt,
                    error = %err,
                    "MongoDB not answering yet"
                );
                sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
            }
        }
    }

    // `connect_attempts` of zero: trust the client without pinging.
    Ok((client, database))
}

/// Round-trip a `ping` command.
pub async fn ping(database: &Database) -> Result<(), mongodb::error::Error> {
    database.run_command(doc! { "ping": 1 }).await.map(|_| ())
}
