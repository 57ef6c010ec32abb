//! Engine configuration loading, with baked-in defaults.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::clock::{MAX_GAME_CLOCK_MINUTES, MIN_GAME_CLOCK_MINUTES};
use crate::state::game::GameMode;

/// Default location on disk where the engine looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/engine.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "COURTSIDE_CONFIG_PATH";
/// Default directory for the durable store slots.
const DEFAULT_DATA_DIR: &str = "data";
/// Default remote backend base URL.
const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
/// Default game clock duration in minutes.
const DEFAULT_TIMER_MINUTES: u32 = 10;

/// Immutable runtime configuration for the engine host.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding the durable store files.
    pub data_dir: PathBuf,
    /// Base URL of the remote store of record.
    pub api_base_url: String,
    /// Scoreboard variant this host runs.
    pub mode: GameMode,
    /// Configured game clock duration in minutes, clamped to the clock bounds.
    pub timer_minutes: u32,
    /// Venue sent along with synced game records, when known.
    pub location: Option<String>,
}

impl EngineConfig {
    /// Load the configuration from disk, falling back to baked-in defaults
    /// when the file is missing or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded engine config");
                    config
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
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            api_base_url: DEFAULT_API_BASE_URL.into(),
            mode: GameMode::Basic,
            timer_minutes: DEFAULT_TIMER_MINUTES,
            location: None,
        }
    }
}

/// JSON representation of the configuration file. Every field is optional;
/// missing fields take the defaults.
#[derive(Debug, Deserialize)]
struct RawConfig {
    data_dir: Option<PathBuf>,
    api_base_url: Option<String>,
    mode: Option<GameMode>,
    timer_minutes: Option<u32>,
    location: Option<String>,
}

impl From<RawConfig> for EngineConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: raw.data_dir.unwrap_or(defaults.data_dir),
            api_base_url: raw.api_base_url.unwrap_or(defaults.api_base_url),
            mode: raw.mode.unwrap_or(defaults.mode),
            timer_minutes: raw
                .timer_minutes
                .unwrap_or(defaults.timer_minutes)
                .clamp(MIN_GAME_CLOCK_MINUTES, MAX_GAME_CLOCK_MINUTES),
            location: raw.location,
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
