use std::path::{Path, PathBuf};
use std::time::Duration;

use orchestrator::{GameConfig, ModelAgentConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

pub const CONFIG_DIR: &str = ".arena";
pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_PORT: u16 = 3001;

/// Environment variable holding the OpenRouter API key
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Used when neither the config file nor the request names any participants.
pub const DEFAULT_ROSTER: &[&str] = &[
    "Alex", "Avery", "Blake", "Cameron", "Casey", "Charlie", "Clement", "Dakota", "Elliot",
    "Finley", "Harper", "Jamie",
];

/// Number of default names seated when the roster is left empty
pub const DEFAULT_ROSTER_SIZE: usize = 6;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Model-backed agents need an API key in {0}")]
    MissingApiKey(&'static str),
}

/// Who plays the participants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentBackend {
    /// Offline agents with canned replies and random legal votes
    #[default]
    Scripted,
    /// Chat completion model behind an OpenAI-compatible endpoint
    #[serde(rename = "openrouter")]
    OpenRouter {
        #[serde(default = "default_model")]
        model: String,
        #[serde(default = "default_base_url")]
        base_url: String,
    },
}

fn default_model() -> String {
    ModelAgentConfig::default().model
}

fn default_base_url() -> String {
    orchestrator::openrouter::DEFAULT_BASE_URL.to_string()
}

/// Server settings stored in `.arena/config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Participant names used when a create request does not list any
    pub roster: Vec<String>,
    pub agent: AgentBackend,
    /// Play every round to game over once a session is started
    pub auto_advance: bool,
    /// Pause between rounds when auto-advancing
    pub round_delay_ms: u64,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            roster: Vec::new(),
            agent: AgentBackend::default(),
            auto_advance: false,
            round_delay_ms: 0,
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn path(project_dir: &Path) -> PathBuf {
        project_dir.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Read config from `path`, falling back to defaults.
    pub async fn read(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "Config file does not exist, using defaults");
            return Self::default();
        }

        match Self::try_read(path).await {
            Ok(config) => {
                debug!(path = %path.display(), "Config loaded successfully");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    pub async fn try_read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).await?;
        Ok(toml::from_str(&content)?)
    }

    pub async fn write(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).await?;
        debug!(path = %path.display(), "Config saved successfully");
        Ok(())
    }

    /// Configured roster, or the first default names when it is empty.
    pub fn roster(&self) -> Vec<String> {
        if self.roster.is_empty() {
            default_roster(DEFAULT_ROSTER_SIZE)
        } else {
            self.roster.clone()
        }
    }

    pub fn round_delay(&self) -> Duration {
        Duration::from_millis(self.round_delay_ms)
    }
}

pub fn default_roster(size: usize) -> Vec<String> {
    DEFAULT_ROSTER
        .iter()
        .take(size)
        .map(|name| name.to_string())
        .collect()
}
