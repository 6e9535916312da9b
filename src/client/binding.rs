//! Seam between participant-side logic and the Race Store.

use std::sync::Arc;

use futures::{
    StreamExt,
    future::BoxFuture,
    stream::BoxStream,
};
use thiserror::Error;
use tokio::sync::{broadcast::error::RecvError, mpsc, oneshot};
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::race::RaceSnapshot,
    services::race_service,
    state::{SharedState, transaction::Transaction},
};

/// Failures surfaced by a [`RaceStoreClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The store refused the batch.
    #[error("batch rejected: {message}")]
    Rejected {
        /// Reason given by the store.
        message: String,
    },
    /// The store answered with an unexpected HTTP status.
    #[error("unexpected response status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },
    /// The request never reached the store.
    #[cfg(feature = "remote-client")]
    #[error("request to race store failed")]
    Transport(#[from] reqwest::Error),
}

/// Subscription and batched writes against a Race Store.
pub trait RaceStoreClient: Send + Sync {
    /// Live snapshots of `race_id`, starting with the current one when the
    /// race exists. The stream ends when the connection is lost.
    fn subscribe(&self, race_id: Uuid) -> BoxStream<'static, RaceSnapshot>;
    /// Apply a batch atomically.
    fn transact(&self, tx: Transaction) -> BoxFuture<'static, Result<(), ClientError>>;
}

/// Resolves once a queued batch has been handed to the store, whatever the
/// outcome. Dropping it does not cancel the write.
pub type Sent = oneshot::Receiver<()>;

/// Ordered, non-blocking writer for one participant's batches.
///
/// Batches are sent one at a time in the order they were queued, so a slow
/// earlier write can never land after a later one. Failures are only logged.
/// The draining task ends once every clone of the writer is dropped and the
/// queue is empty.
#[derive(Clone)]
pub struct BatchWriter {
    queue: mpsc::UnboundedSender<(Transaction, oneshot::Sender<()>)>,
}

impl BatchWriter {
    /// Spawn the draining task for `client`.
    pub fn spawn(client: Arc<dyn RaceStoreClient>) -> Self {
        let (queue, mut pending) = mpsc::unbounded_channel::<(Transaction, oneshot::Sender<()>)>();
        tokio::spawn(async move {
            while let Some((tx, sent)) = pending.recv().await {
                if let Err(err) = client.transact(tx).await {
                    warn!(error = %err, "race store write failed");
                }
                let _ = sent.send(());
            }
        });
        Self { queue }
    }

    /// Queue a batch behind every batch queued before it.
    pub fn send(&self, tx: Transaction) -> Sent {
        let (sent_tx, sent_rx) = oneshot::channel();
        if self.queue.send((tx, sent_tx)).is_err() {
            warn!("race store writer is gone; dropping batch");
        }
        sent_rx
    }
}

/// Client talking to a Race Store living in the same process.
#[derive(Clone)]
pub struct InProcessClient {
    state: SharedState,
}

impl InProcessClient {
    /// Bind to the store held by `state`.
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

impl RaceStoreClient for InProcessClient {
    fn subscribe(&self, race_id: Uuid) -> BoxStream<'static, RaceSnapshot> {
        let state = self.state.clone();
        async_stream::stream! {
            let (mut updates, current) = race_service::subscribe(&state, race_id).await;
            if let Some(snapshot) = current {
                yield snapshot;
            }
            loop {
                match updates.recv().await {
                    Ok(snapshot) => yield snapshot,
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        }
        .boxed()
    }

    fn transact(&self, tx: Transaction) -> BoxFuture<'static, Result<(), ClientError>> {
        let state = self.state.clone();
        Box::pin(async move {
            race_service::transact(&state, tx)
                .await
                .map(|_| ())
                .map_err(|err| ClientError::Rejected {
                    message: err.to_string(),
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, transaction::EntrantPatch},
    };

    #[tokio::test]
    async fn in_process_subscription_starts_with_current_snapshot() {
        let state = AppState::new(AppConfig::default());
        let race = race_service::create_race(&state, Some("text".into()))
            .await
            .unwrap();
        let client = InProcessClient::new(state);

        let mut updates = client.subscribe(race.race.id);
        assert_eq!(updates.next().await.unwrap().version, race.version);

        let entrant_id = Uuid::new_v4();
        client
            .transact(
                Transaction::new()
                    .update_entrant(entrant_id, EntrantPatch::default())
                    .link(race.race.id, entrant_id),
            )
            .await
            .unwrap();
        let next = updates.next().await.unwrap();
        assert_eq!(next.entrants.len(), 1);
    }

    #[tokio::test]
    async fn rejected_batches_surface_as_client_errors() {
        let client = InProcessClient::new(AppState::new(AppConfig::default()));
        let err = client
            .transact(Transaction::new().link(Uuid::new_v4(), Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected { .. }));
    }

    struct SlowFirstClient {
        inner: InProcessClient,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl RaceStoreClient for SlowFirstClient {
        fn subscribe(&self, race_id: Uuid) -> BoxStream<'static, RaceSnapshot> {
            self.inner.subscribe(race_id)
        }

        fn transact(&self, tx: Transaction) -> BoxFuture<'static, Result<(), ClientError>> {
            let first = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
                == 0;
            let write = self.inner.transact(tx);
            Box::pin(async move {
                if first {
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                }
                write.await
            })
        }
    }

    #[tokio::test]
    async fn batches_land_in_queue_order_even_when_the_first_is_slow() {
        let state = AppState::new(AppConfig::default());
        let race = race_service::create_race(&state, Some("text".into()))
            .await
            .unwrap();
        let race_id = race.race.id;
        let entrant_id = Uuid::new_v4();
        let writer = BatchWriter::spawn(Arc::new(SlowFirstClient {
            inner: InProcessClient::new(state.clone()),
            calls: Default::default(),
        }));

        let rename = |name: &str| {
            Transaction::new().update_entrant(
                entrant_id,
                EntrantPatch {
                    name: Some(name.into()),
                    ..EntrantPatch::default()
                },
            )
        };
        writer.send(rename("Ad").link(race_id, entrant_id));
        writer.send(rename("Ada")).await.unwrap();

        let snapshot = race_service::get_race(&state, race_id).await.unwrap();
        assert_eq!(snapshot.roster(), vec!["Ada"]);
    }
}
