//! Fan-out of race snapshots to subscribers.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use uuid::Uuid;

use crate::dto::race::RaceSnapshot;

/// Per-race broadcast hubs, created on first subscription and dropped with
/// their last subscriber.
pub struct RaceHubs {
    hubs: Arc<DashMap<Uuid, RaceHub>>,
    capacity: usize,
}

impl RaceHubs {
    /// Build an empty registry whose hubs buffer `capacity` snapshots each.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: Arc::new(DashMap::new()),
            capacity,
        }
    }

    /// Register a subscriber for the given race.
    pub fn subscribe(&self, race_id: Uuid) -> RaceSubscription {
        let receiver = self
            .hubs
            .entry(race_id)
            .or_insert_with(|| RaceHub::new(self.capacity))
            .subscribe();
        RaceSubscription {
            race_id,
            receiver,
            hubs: Arc::clone(&self.hubs),
        }
    }

    /// Push a snapshot to every subscriber of its race. Hubs left without
    /// subscribers are dropped.
    pub fn broadcast(&self, snapshot: RaceSnapshot) {
        let race_id = snapshot.race.id;
        let idle = match self.hubs.get(&race_id) {
            Some(hub) => {
                hub.broadcast(snapshot);
                hub.receiver_count() == 0
            }
            None => false,
        };

        if idle {
            self.hubs
                .remove_if(&race_id, |_, hub| hub.receiver_count() == 0);
        }
    }

    /// Number of live subscribers for a race.
    pub fn subscriber_count(&self, race_id: &Uuid) -> usize {
        self.hubs
            .get(race_id)
            .map(|hub| hub.receiver_count())
            .unwrap_or(0)
    }
}

/// Receiving end of a race hub. Dropping the last subscription of a race
/// removes its hub.
pub struct RaceSubscription {
    race_id: Uuid,
    receiver: broadcast::Receiver<RaceSnapshot>,
    hubs: Arc<DashMap<Uuid, RaceHub>>,
}

impl RaceSubscription {
    /// Wait for the next snapshot of the race.
    pub async fn recv(&mut self) -> Result<RaceSnapshot, RecvError> {
        self.receiver.recv().await
    }

    /// Take a snapshot if one is already buffered.
    pub fn try_recv(&mut self) -> Result<RaceSnapshot, TryRecvError> {
        self.receiver.try_recv()
    }
}

impl Drop for RaceSubscription {
    fn drop(&mut self) {
        // Our own receiver is still alive here.
        self.hubs
            .remove_if(&self.race_id, |_, hub| hub.receiver_count() <= 1);
    }
}

/// Broadcast channel wrapper carrying snapshots of a single race.
pub struct RaceHub {
    sender: broadcast::Sender<RaceSnapshot>,
}

impl RaceHub {
    /// Construct a hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<RaceSnapshot> {
        self.sender.subscribe()
    }

    /// Send a snapshot to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, snapshot: RaceSnapshot) {
        let _ = self.sender.send(snapshot);
    }

    fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
