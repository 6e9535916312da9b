//! Shared application state.

pub mod hub;
pub mod lifecycle;
pub mod race;
pub mod transaction;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tracing::warn;

use crate::{
    clock::{Clock, SystemClock},
    config::AppConfig,
    dao::race_store::RaceStore,
};

pub use self::hub::RaceHubs;
use self::transaction::{Commit, RaceTable};

/// Handle to the application state shared by routes and tasks.
pub type SharedState = Arc<AppState>;

/// Snapshots buffered per race before a slow subscriber starts lagging.
const HUB_CAPACITY: usize = 32;

/// Central application state: the authoritative race table, its fan-out hubs
/// and the optional persistence backend.
pub struct AppState {
    config: Arc<AppConfig>,
    clock: Arc<dyn Clock>,
    race_store: RwLock<Option<Arc<dyn RaceStore>>>,
    degraded: watch::Sender<bool>,
    table: RwLock<RaceTable>,
    hubs: RaceHubs,
    persistence_tx: mpsc::UnboundedSender<Commit>,
    persistence_rx: Mutex<Option<mpsc::UnboundedReceiver<Commit>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`AppState::new`] with an explicit time source.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let (persistence_tx, persistence_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            config: Arc::new(config),
            clock,
            race_store: RwLock::new(None),
            degraded: degraded_tx,
            table: RwLock::new(RaceTable::default()),
            hubs: RaceHubs::new(HUB_CAPACITY),
            persistence_tx,
            persistence_rx: Mutex::new(Some(persistence_rx)),
        })
    }

    /// Shared configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// Current time in epoch milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Obtain a handle to the current race store, if one is installed.
    pub async fn race_store(&self) -> Option<Arc<dyn RaceStore>> {
        let guard = self.race_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a new race store implementation and leave degraded mode.
    pub async fn install_race_store(&self, store: Arc<dyn RaceStore>) {
        {
            let mut guard = self.race_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current race store and enter degraded mode.
    pub async fn clear_race_store(&self) {
        {
            let mut guard = self.race_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Authoritative in-memory table of races and entrants.
    pub fn table(&self) -> &RwLock<RaceTable> {
        &self.table
    }

    /// Per-race broadcast hubs.
    pub fn hubs(&self) -> &RaceHubs {
        &self.hubs
    }

    /// Hand a committed batch to the persistence writer. Skipped while degraded.
    ///
    /// Callers hold the table write guard so the writer sees commits in the
    /// order they were applied.
    pub fn queue_persistence(&self, commit: Commit) {
        if *self.degraded.borrow() {
            return;
        }
        if self.persistence_tx.send(commit).is_err() {
            warn!("persistence writer is gone; dropping commit");
        }
    }

    /// Take the receiving end of the persistence queue. Only the first caller gets it.
    pub async fn take_persistence_queue(&self) -> Option<mpsc::UnboundedReceiver<Commit>> {
        self.persistence_rx.lock().await.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::race_store::memory::MemoryRaceStore;

    #[tokio::test]
    async fn installing_a_store_leaves_degraded_mode() {
        let state = AppState::new(AppConfig::default());
        let mut watcher = state.degraded_watcher();
        assert!(state.is_degraded().await);

        state
            .install_race_store(Arc::new(MemoryRaceStore::new()))
            .await;
        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow());
        assert!(state.race_store().await.is_some());

        state.clear_race_store().await;
        assert!(state.is_degraded().await);
        assert!(state.race_store().await.is_none());
    }

    #[tokio::test]
    async fn persistence_queue_is_handed_out_once() {
        let state = AppState::new(AppConfig::default());
        assert!(state.take_persistence_queue().await.is_some());
        assert!(state.take_persistence_queue().await.is_none());
    }
}
