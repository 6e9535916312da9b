//! Race page: joins a race, follows its snapshots and decides what to show.

use std::sync::Arc;

use futures::StreamExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    binding::{BatchWriter, RaceStoreClient, Sent},
    countdown::{CountdownHandle, start_ticker},
    identity::ParticipantIdentity,
    keystrokes::{Key, KeyBuffer},
    local_store::LocalResult,
    phase::ViewPhase,
    profile::ProfilePanel,
};
use crate::{
    clock::Clock,
    dto::race::RaceSnapshot,
    state::{
        lifecycle::START_LEAD_MS,
        transaction::{EntrantPatch, RacePatch, Transaction},
    },
};

/// Input of the render loop.
#[derive(Debug, Clone)]
pub enum ViewSignal {
    /// The store pushed a new state of the race.
    Snapshot(RaceSnapshot),
    /// Countdown ticker fired; time moved on.
    Tick,
}

/// What the page shows right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Nothing received from the store yet.
    Loading,
    /// Race not started.
    Waiting {
        /// Entrant names in join order, `Unnamed` standing in for empty names.
        roster: Vec<String>,
        /// Whether the start control is offered.
        is_owner: bool,
    },
    /// Start is scheduled.
    Countdown {
        /// Whole seconds left, rounded up.
        seconds: u64,
    },
    /// Typing is open.
    Typing {
        /// Paragraph to type.
        text: String,
        /// What the participant has typed so far.
        typed: String,
    },
}

/// One participant's view of one race.
///
/// Background tasks (subscription forwarder, countdown ticker) are aborted
/// when the view is dropped. Writes already queued still go out.
pub struct RaceView {
    race_id: Uuid,
    entrant_id: Uuid,
    identity: ParticipantIdentity,
    writer: BatchWriter,
    clock: Arc<dyn Clock>,
    snapshot: Option<RaceSnapshot>,
    buffer: KeyBuffer,
    signals_tx: mpsc::UnboundedSender<ViewSignal>,
    signals_rx: mpsc::UnboundedReceiver<ViewSignal>,
    subscription: JoinHandle<()>,
    countdown: Option<CountdownHandle>,
}

impl RaceView {
    /// Join `race_id` and start following it.
    ///
    /// Resolves the local entrant id, sends the join batch (cached name and
    /// team, zero progress, link), subscribes and starts the ticker.
    pub fn open(
        race_id: Uuid,
        identity: ParticipantIdentity,
        client: Arc<dyn RaceStoreClient>,
        clock: Arc<dyn Clock>,
    ) -> LocalResult<Self> {
        let entrant_id = identity.entrant_id(race_id)?;
        let join = Transaction::new()
            .update_entrant(
                entrant_id,
                EntrantPatch {
                    name: Some(identity.name()?),
                    team: Some(identity.team()?),
                    progress: Some(0.0),
                    finished_at: None,
                },
            )
            .link(race_id, entrant_id);
        let writer = BatchWriter::spawn(Arc::clone(&client));
        writer.send(join);

        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let subscription = spawn_forwarder(client.subscribe(race_id), signals_tx.clone());
        debug!(race_id = %race_id, entrant_id = %entrant_id, "race view opened");

        let mut view = Self {
            race_id,
            entrant_id,
            identity,
            writer,
            clock,
            snapshot: None,
            buffer: KeyBuffer::new(),
            signals_tx,
            signals_rx,
            subscription,
            countdown: None,
        };
        view.restart_ticker(None);
        Ok(view)
    }

    /// Race this view follows.
    pub fn race_id(&self) -> Uuid {
        self.race_id
    }

    /// This participant's entrant in the race.
    pub fn entrant_id(&self) -> Uuid {
        self.entrant_id
    }

    /// Latest snapshot received.
    pub fn snapshot(&self) -> Option<&RaceSnapshot> {
        self.snapshot.as_ref()
    }

    /// Name/team editor bound to this participant's entrant.
    pub fn profile(&self) -> ProfilePanel {
        ProfilePanel::new(self.entrant_id, self.identity.clone(), self.writer.clone())
    }

    /// Phase derived from the latest snapshot and the clock.
    pub fn phase(&self) -> ViewPhase {
        ViewPhase::derive(self.snapshot.as_ref(), self.clock.now_ms())
    }

    /// Whether this participant created the race, according to local storage.
    pub fn is_owner(&self) -> bool {
        self.identity.is_owner(self.race_id).unwrap_or_else(|err| {
            warn!(race_id = %self.race_id, error = %err, "cannot read owned races");
            false
        })
    }

    /// Keys captured so far.
    pub fn typed(&self) -> &str {
        self.buffer.as_str()
    }

    /// Render model for the current phase.
    pub fn screen(&self) -> Screen {
        let Some(snapshot) = self.snapshot.as_ref() else {
            return Screen::Loading;
        };
        match self.phase() {
            ViewPhase::Initializing => Screen::Loading,
            ViewPhase::Waiting => Screen::Waiting {
                roster: snapshot.roster(),
                is_owner: self.is_owner(),
            },
            ViewPhase::Countdown { seconds } => Screen::Countdown { seconds },
            ViewPhase::Active => Screen::Typing {
                text: snapshot.race.text.clone(),
                typed: self.buffer.as_str().to_owned(),
            },
        }
    }

    /// Wait for the next signal of the render loop.
    pub async fn next_signal(&mut self) -> Option<ViewSignal> {
        self.signals_rx.recv().await
    }

    /// Apply a signal. Returns whether the screen may have changed.
    pub fn handle_signal(&mut self, signal: ViewSignal) -> bool {
        match signal {
            ViewSignal::Tick => true,
            ViewSignal::Snapshot(snapshot) => self.apply_snapshot(snapshot),
        }
    }

    fn apply_snapshot(&mut self, snapshot: RaceSnapshot) -> bool {
        let previous_start = match self.snapshot.as_ref() {
            Some(current) if snapshot.version < current.version => {
                debug!(
                    race_id = %self.race_id,
                    stale = snapshot.version,
                    current = current.version,
                    "ignoring stale snapshot"
                );
                return false;
            }
            Some(current) => Some(current.race.started_at),
            None => None,
        };

        let started_at = snapshot.race.started_at;
        self.snapshot = Some(snapshot);
        if previous_start != Some(started_at) {
            self.restart_ticker(started_at);
        }
        true
    }

    fn restart_ticker(&mut self, started_at: Option<u64>) {
        let signals = self.signals_tx.clone();
        self.countdown = Some(start_ticker(started_at, Arc::clone(&self.clock), move || {
            signals.send(ViewSignal::Tick).is_ok()
        }));
    }

    /// Schedule the race to open [`START_LEAD_MS`] from now.
    ///
    /// Only offered to the local owner of a race that is still waiting;
    /// returns `None` otherwise.
    pub fn start(&self) -> Option<Sent> {
        if self.phase() != ViewPhase::Waiting || !self.is_owner() {
            return None;
        }
        let started_at = self.clock.now_ms() + START_LEAD_MS;
        let tx = Transaction::new().update_race(
            self.race_id,
            RacePatch {
                text: None,
                started_at: Some(started_at),
            },
        );
        debug!(race_id = %self.race_id, started_at, "starting race");
        Some(self.writer.send(tx))
    }

    /// Feed a key to the typing buffer. Keys are ignored until typing opens.
    pub fn handle_key(&mut self, key: Key) -> bool {
        if self.phase() != ViewPhase::Active {
            return false;
        }
        self.buffer.apply(key);
        true
    }

    /// Stop background tasks.
    pub fn teardown(self) {}
}

impl Drop for RaceView {
    fn drop(&mut self) {
        self.subscription.abort();
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
    }
}

fn spawn_forwarder(
    mut snapshots: futures::stream::BoxStream<'static, RaceSnapshot>,
    signals: mpsc::UnboundedSender<ViewSignal>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(snapshot) = snapshots.next().await {
            if signals.send(ViewSignal::Snapshot(snapshot)).is_err() {
                break;
            }
        }
        debug!("race subscription ended");
    })
}
