//! End-to-end race flow with two participants sharing one in-process store.

use std::{sync::Arc, time::Duration};

use tokio::time::timeout;
use typerace::{
    client::{
        binding::{InProcessClient, RaceStoreClient},
        identity::ParticipantIdentity,
        keystrokes::Key,
        local_store::{LocalStore, MemoryLocalStore},
        view::{RaceView, Screen},
    },
    clock::ManualClock,
    config::AppConfig,
    dao::race_store::{RaceStore, memory::MemoryRaceStore},
    services::{persistence, race_service},
    state::{AppState, SharedState, lifecycle::START_LEAD_MS},
};
use uuid::Uuid;

const NOW: u64 = 1_700_000_000_000;

fn participant(store: Arc<dyn LocalStore>) -> ParticipantIdentity {
    ParticipantIdentity::new(store)
}

fn open(state: &SharedState, clock: &Arc<ManualClock>, race_id: Uuid, identity: ParticipantIdentity) -> RaceView {
    let client: Arc<dyn RaceStoreClient> = Arc::new(InProcessClient::new(state.clone()));
    RaceView::open(race_id, identity, client, clock.clone()).unwrap()
}

async fn pump_until(view: &mut RaceView, done: impl Fn(&Screen) -> bool) -> Screen {
    timeout(Duration::from_secs(5), async {
        loop {
            let screen = view.screen();
            if done(&screen) {
                return screen;
            }
            let signal = view.next_signal().await.unwrap();
            view.handle_signal(signal);
        }
    })
    .await
    .expect("screen never reached the expected state")
}

fn roster_of(screen: &Screen) -> Vec<String> {
    match screen {
        Screen::Waiting { roster, .. } => roster.clone(),
        _ => vec![],
    }
}

#[tokio::test]
async fn participants_see_each_other_and_race_together() {
    let clock = Arc::new(ManualClock::new(NOW));
    let state = AppState::with_clock(AppConfig::default(), clock.clone());
    let race = race_service::create_race(&state, Some("the quick fox".into()))
        .await
        .unwrap();
    let race_id = race.race.id;

    let owner_identity = participant(Arc::new(MemoryLocalStore::new()));
    owner_identity.mark_owned(race_id).unwrap();
    let mut owner = open(&state, &clock, race_id, owner_identity);
    let mut guest = open(&state, &clock, race_id, participant(Arc::new(MemoryLocalStore::new())));

    owner.profile().set_name("Ada").unwrap().await.unwrap();
    guest.profile().set_name("Grace").unwrap().await.unwrap();
    guest.profile().set_team("Blue").unwrap().await.unwrap();

    for view in [&mut owner, &mut guest] {
        let screen = pump_until(view, |screen| {
            let mut roster = roster_of(screen);
            roster.sort();
            roster == ["Ada", "Grace"]
        })
        .await;
        assert!(matches!(screen, Screen::Waiting { .. }));
    }
    assert!(matches!(owner.screen(), Screen::Waiting { is_owner: true, .. }));
    assert!(matches!(guest.screen(), Screen::Waiting { is_owner: false, .. }));
    assert!(guest.start().is_none());

    owner.start().unwrap().await.unwrap();
    for view in [&mut owner, &mut guest] {
        let screen = pump_until(view, |screen| matches!(screen, Screen::Countdown { .. })).await;
        assert_eq!(screen, Screen::Countdown { seconds: 5 });
    }

    clock.advance(START_LEAD_MS - 1_500);
    assert_eq!(guest.screen(), Screen::Countdown { seconds: 2 });

    clock.advance(1_500);
    for key in ["t", "h", "x", "Backspace", "e", "Shift"] {
        guest.handle_key(Key::from_name(key));
    }
    assert_eq!(
        guest.screen(),
        Screen::Typing {
            text: "the quick fox".into(),
            typed: "the".into()
        }
    );
    // Typing is local only.
    assert_eq!(owner.typed(), "");

    let snapshot = race_service::get_race(&state, race_id).await.unwrap();
    assert_eq!(snapshot.race.started_at, Some(NOW + START_LEAD_MS));
    let grace = snapshot
        .entrants
        .iter()
        .find(|entrant| entrant.name == "Grace")
        .unwrap();
    assert_eq!(grace.team, "Blue");
    assert_eq!(grace.progress, 0.0);
}

#[tokio::test]
async fn returning_participant_keeps_entrant_and_profile() {
    let clock = Arc::new(ManualClock::new(NOW));
    let state = AppState::with_clock(AppConfig::default(), clock.clone());
    let race_id = race_service::create_race(&state, None).await.unwrap().race.id;
    let local: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());

    let first = open(&state, &clock, race_id, participant(local.clone()));
    let entrant_id = first.entrant_id();
    first.profile().set_name("Linus").unwrap().await.unwrap();
    first.profile().set_team("Green").unwrap().await.unwrap();
    first.teardown();

    let mut again = open(&state, &clock, race_id, participant(local));
    assert_eq!(again.entrant_id(), entrant_id);
    assert_eq!(again.profile().name().unwrap(), "Linus");
    assert_eq!(again.profile().team().unwrap(), "Green");

    let screen = pump_until(&mut again, |screen| roster_of(screen) == ["Linus"]).await;
    assert_eq!(roster_of(&screen).len(), 1);
}

#[tokio::test]
async fn committed_races_survive_a_restart() {
    let store = Arc::new(MemoryRaceStore::new());
    let clock = Arc::new(ManualClock::new(NOW));

    let state = AppState::with_clock(AppConfig::default(), clock.clone());
    state.install_race_store(store.clone()).await;
    let writer = tokio::spawn(persistence::run(state.clone()));

    let race_id = race_service::create_race(&state, Some("persist me".into()))
        .await
        .unwrap()
        .race
        .id;
    let view = open(&state, &clock, race_id, participant(Arc::new(MemoryLocalStore::new())));
    view.profile().set_name("Barbara").unwrap().await.unwrap();

    timeout(Duration::from_secs(5), async {
        loop {
            let stored = store.find_entrants(race_id).await.unwrap();
            if stored.iter().any(|entrant| entrant.name == "Barbara") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("entrant never persisted");
    writer.abort();

    let restarted = AppState::with_clock(AppConfig::default(), clock.clone());
    restarted.install_race_store(store.clone()).await;
    let snapshot = race_service::get_race(&restarted, race_id).await.unwrap();
    assert_eq!(snapshot.race.text, "persist me");
    assert_eq!(snapshot.roster(), vec!["Barbara"]);
}
