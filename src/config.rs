use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;

use crate::api::ApiConfig;
use crate::audio::{AudioFeedback, AudioSink, CommandSink, TerminalBell};
use crate::session::{SessionSettings, TimerMode};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    pub volume: f32,
    /// External player for the sound files, e.g. `paplay` or `afplay`.
    /// Without one the terminal bell is used.
    pub player: Option<String>,
    /// Player arguments; `{file}`, `{volume}` and `{percent}` are filled in
    pub player_args: Vec<String>,
    pub sounds_dir: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.5,
            player: None,
            player_args: Vec::new(),
            sounds_dir: None,
        }
    }
}

impl AudioConfig {
    pub fn feedback(&self) -> AudioFeedback {
        let sink: Box<dyn AudioSink> = match (&self.player, &self.sounds_dir) {
            (Some(player), Some(dir)) => {
                Box::new(CommandSink::new(player.clone(), dir).with_args(self.player_args.clone()))
            }
            _ => Box::new(TerminalBell),
        };
        AudioFeedback::new(self.enabled, self.volume, sink)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub level: String,
    pub timer_mode: TimerMode,
    pub time_limit_secs: u32,
    pub request_timeout_ms: u64,
    pub log_level: String,
    pub audio: AudioConfig,
}

impl Default for Config {
    fn default() -> Self {
        let api = ApiConfig::default();
        let session = SessionSettings::default();
        Self {
            server_url: api.base_url,
            level: session.level,
            timer_mode: session.timer_mode,
            time_limit_secs: session.time_limit_secs,
            request_timeout_ms: api.request_timeout_ms,
            log_level: "info".to_string(),
            audio: AudioConfig::default(),
        }
    }
}

impl Config {
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.server_url.clone(),
            request_timeout_ms: self.request_timeout_ms,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            level: self.level.clone(),
            timer_mode: self.timer_mode,
            time_limit_secs: self.time_limit_secs.max(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "kasongo") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("kasongo_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Like [`ConfigStore::load`] but reports a broken file instead of
    /// logging it. A missing file is not an error.
    pub fn try_load(&self) -> Result<Config, ConfigError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        self.try_load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring unreadable config");
            Config::default()
        })
    }

    fn save(&self, cfg: &Config) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
