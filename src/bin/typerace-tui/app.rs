use std::{
    env,
    fs::File,
    io::{self, Stdout, Write},
    sync::{Arc, Mutex},
};

use anyhow::{Context, bail};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::Print,
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use typerace::{
    client::{
        binding::RaceStoreClient,
        identity::ParticipantIdentity,
        keystrokes::Key,
        local_store::FileLocalStore,
        remote::HttpRaceClient,
        view::{RaceView, Screen},
    },
    clock::SystemClock,
};
use uuid::Uuid;

const DEFAULT_LOCAL_STATE: &str = ".typerace-local.json";
const LOG_FILE: &str = "typerace-tui.log";

/// Line being edited at the bottom of the waiting screen.
enum Prompt {
    None,
    Name(String),
}

pub fn run() -> anyhow::Result<()> {
    init_tracing()?;

    let mut args = env::args().skip(1);
    let Some(server_url) = args.next() else {
        bail!("usage: typerace-tui <server-url> [race-id]");
    };
    let race_id = args
        .next()
        .map(|raw| Uuid::parse_str(&raw).context("parsing race id"))
        .transpose()?;

    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
    let outcome = runtime.block_on(run_race(server_url, race_id));
    // The key reader thread stays blocked on terminal input.
    runtime.shutdown_background();
    outcome
}

async fn run_race(server_url: String, race_id: Option<Uuid>) -> anyhow::Result<()> {
    let local_path =
        env::var("TYPERACE_LOCAL_STATE").unwrap_or_else(|_| DEFAULT_LOCAL_STATE.into());
    let store = FileLocalStore::open(&local_path)
        .with_context(|| format!("opening local state {local_path}"))?;
    let identity = ParticipantIdentity::new(Arc::new(store));

    let http = HttpRaceClient::new(server_url).context("building HTTP client")?;
    let race_id = match race_id {
        Some(race_id) => race_id,
        None => {
            let snapshot = http.create_race(None).await.context("creating race")?;
            identity
                .mark_owned(snapshot.race.id)
                .context("recording race ownership")?;
            info!(race_id = %snapshot.race.id, "race created");
            snapshot.race.id
        }
    };
    let teams = http.teams().await.unwrap_or_else(|err| {
        warn!(error = %err, "cannot list teams");
        Vec::new()
    });

    let client: Arc<dyn RaceStoreClient> = Arc::new(http);
    let mut view = RaceView::open(race_id, identity, client, Arc::new(SystemClock))
        .context("opening race view")?;

    let mut stdout = io::stdout();
    enable_raw_mode().context("enabling raw mode")?;
    execute!(stdout, EnterAlternateScreen, Hide).context("preparing terminal")?;

    let outcome = event_loop(&mut view, &teams, &mut stdout).await;

    execute!(stdout, Show, LeaveAlternateScreen).ok();
    disable_raw_mode().ok();
    view.teardown();
    println!("race id: {race_id}");
    outcome
}

async fn event_loop(
    view: &mut RaceView,
    teams: &[String],
    stdout: &mut Stdout,
) -> anyhow::Result<()> {
    let mut keys = spawn_key_reader();
    let mut prompt = Prompt::None;
    render(view, &prompt, stdout)?;

    loop {
        tokio::select! {
            signal = view.next_signal() => {
                let Some(signal) = signal else { return Ok(()) };
                if !view.handle_signal(signal) {
                    continue;
                }
            }
            key = keys.recv() => {
                let Some(key) = key else { return Ok(()) };
                if !handle_key(view, teams, &mut prompt, key)? {
                    return Ok(());
                }
            }
        }
        render(view, &prompt, stdout)?;
    }
}

/// Returns `false` when the participant asked to quit.
fn handle_key(
    view: &mut RaceView,
    teams: &[String],
    prompt: &mut Prompt,
    key: KeyEvent,
) -> anyhow::Result<bool> {
    if key.code == KeyCode::Esc && matches!(prompt, Prompt::None) {
        return Ok(false);
    }

    if let Prompt::Name(draft) = prompt {
        // Every edit is saved as it is typed; Enter and Esc only close the prompt.
        match key.code {
            KeyCode::Enter | KeyCode::Esc => *prompt = Prompt::None,
            KeyCode::Backspace => {
                draft.pop();
                view.profile().set_name(draft).context("saving name")?;
            }
            KeyCode::Char(c) => {
                draft.push(c);
                view.profile().set_name(draft).context("saving name")?;
            }
            _ => {}
        }
        return Ok(true);
    }

    match view.screen() {
        Screen::Typing { .. } => {
            view.handle_key(to_key(key.code));
        }
        Screen::Waiting { .. } => match key.code {
            KeyCode::Char('q') => return Ok(false),
            KeyCode::Char('n') => {
                let current = view.profile().name().unwrap_or_default();
                *prompt = Prompt::Name(current);
            }
            KeyCode::Char('t') => cycle_team(view, teams)?,
            KeyCode::Char('s') => {
                view.start();
            }
            _ => {}
        },
        Screen::Loading | Screen::Countdown { .. } => {
            if key.code == KeyCode::Char('q') {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn cycle_team(view: &RaceView, teams: &[String]) -> anyhow::Result<()> {
    if teams.is_empty() {
        return Ok(());
    }
    let profile = view.profile();
    let current = profile.team().unwrap_or_default();
    let next = teams
        .iter()
        .position(|team| *team == current)
        .map_or(0, |index| (index + 1) % teams.len());
    profile.set_team(&teams[next]).context("saving team")?;
    Ok(())
}

fn to_key(code: KeyCode) -> Key {
    match code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Backspace => Key::Backspace,
        _ => Key::Other,
    }
}

fn render(view: &RaceView, prompt: &Prompt, stdout: &mut Stdout) -> anyhow::Result<()> {
    let mut lines = vec![format!("race {}", view.race_id()), String::new()];
    match view.screen() {
        Screen::Loading => lines.push("Loading...".into()),
        Screen::Waiting { roster, is_owner } => {
            lines.push("Waiting for the race to start".into());
            lines.extend(roster.iter().map(|name| format!("  - {name}")));
            lines.push(String::new());
            let profile = view.profile();
            lines.push(format!(
                "you: {} / team {}",
                profile.name().unwrap_or_default(),
                profile.team().unwrap_or_default()
            ));
            let mut help = String::from("[n] name  [t] team  ");
            if is_owner {
                help.push_str("[s] start  ");
            }
            help.push_str("[q] quit");
            lines.push(help);
        }
        Screen::Countdown { seconds } => lines.push(format!("Starting in {seconds}...")),
        Screen::Typing { text, typed } => {
            lines.push(text);
            lines.push(String::new());
            lines.push(format!("> {typed}"));
        }
    }
    if let Prompt::Name(draft) = prompt {
        lines.push(String::new());
        lines.push(format!("name: {draft}_"));
    }

    queue!(stdout, Clear(ClearType::All))?;
    for (row, line) in lines.iter().enumerate() {
        let row = u16::try_from(row).unwrap_or(u16::MAX);
        queue!(stdout, MoveTo(0, row), Print(line))?;
    }
    stdout.flush()?;
    Ok(())
}

/// Forward key presses from a blocking reader thread.
fn spawn_key_reader() -> mpsc::UnboundedReceiver<KeyEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::task::spawn_blocking(move || {
        loop {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if tx.send(key).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "terminal input failed");
                    break;
                }
            }
        }
    });
    rx
}

fn init_tracing() -> anyhow::Result<()> {
    let file = File::create(LOG_FILE).with_context(|| format!("creating {LOG_FILE}"))?;
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,typerace=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
