//! Application-level configuration loading: team labels, race paragraphs and
//! stream settings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use rand::seq::IndexedRandom;
use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TYPERACE_CONFIG_PATH";
const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);
/// Paragraph used when the configuration lists none.
const FALLBACK_PARAGRAPH: &str = "The quick brown fox jumps over the lazy dog.";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    teams: Vec<String>,
    paragraphs: Vec<String>,
    keep_alive: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        teams = app_config.teams.len(),
                        paragraphs = app_config.paragraphs.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Team labels offered by the team selector.
    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    /// Interval between SSE keep-alive comments.
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Pick a paragraph at random for a new race.
    pub fn pick_paragraph(&self) -> String {
        self.paragraphs
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_else(|| FALLBACK_PARAGRAPH.to_owned())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            teams: default_teams(),
            paragraphs: default_paragraphs(),
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default = "default_teams")]
    teams: Vec<String>,
    #[serde(default = "default_paragraphs")]
    paragraphs: Vec<String>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default)]
    keep_alive_ms: Option<Duration>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let paragraphs = value
            .paragraphs
            .into_iter()
            .map(|paragraph| paragraph.trim().to_owned())
            .filter(|paragraph| !paragraph.is_empty())
            .collect();

        Self {
            teams: value.teams,
            paragraphs,
            keep_alive: value.keep_alive_ms.unwrap_or(DEFAULT_KEEP_ALIVE),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_teams() -> Vec<String> {
    ["Red", "Blue", "Green", "Yellow"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn default_paragraphs() -> Vec<String> {
    [
        "The quick brown fox jumps over the lazy dog.",
        "Pack my box with five dozen liquor jugs.",
        "How vexingly quick daft zebras jump!",
        "Sphinx of black quartz, judge my vow.",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}
