use crate::feeds::neynar::NEYNAR_API_BASE;
use crate::feeds::poller::{DEFAULT_BATCH_SIZE, DEFAULT_INTERVAL};
use crate::session::{FrameSettings, ProviderDetail, SafeAreaInsets};
use crate::ui::{FrameLayout, DEFAULT_CONTENT_WIDTH, DEFAULT_TITLE};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_KEY_ENV: &str = "NEYNAR_API_KEY";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub neynar: NeynarConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NeynarConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Seconds to wait for the host context. 0 waits forever.
    #[serde(default = "default_context_timeout_secs")]
    pub context_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    #[serde(default)]
    pub added: bool,
    #[serde(default = "default_true")]
    pub auto_accept_add: bool,
    #[serde(default)]
    pub client_fid: u64,
    #[serde(default)]
    pub user_fid: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub safe_area_insets: SafeAreaInsets,
    #[serde(default)]
    pub providers: Vec<ProviderDetail>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UiConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_content_width")]
    pub content_width: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "castframe=debug".
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_base_url() -> String {
    NEYNAR_API_BASE.to_string()
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL.as_secs()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_context_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_content_width() -> u16 {
    DEFAULT_CONTENT_WIDTH
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NeynarConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            batch_size: default_batch_size(),
            fetch_timeout_secs: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            context_timeout_secs: default_context_timeout_secs(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            added: false,
            auto_accept_add: true,
            client_fid: 0,
            user_fid: 0,
            username: None,
            safe_area_insets: SafeAreaInsets::default(),
            providers: Vec::new(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            content_width: default_content_width(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("castframe")
            .join("config.toml")
    }

    /// Write a default config to `path`, refusing to overwrite an existing file.
    pub fn write_default(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Config file already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content =
            toml::to_string_pretty(&Config::default()).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll.interval_secs == 0 {
            bail!("poll.interval_secs must be greater than 0");
        }
        if self.poll.batch_size == 0 {
            bail!("poll.batch_size must be greater than 0");
        }
        if self.neynar.base_url.trim().is_empty() {
            bail!("neynar.base_url must not be empty");
        }
        Ok(())
    }

    /// API key from the environment, then the config file.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.neynar.api_key.clone())
    }

    pub fn frame_settings(&self) -> FrameSettings {
        FrameSettings {
            poll_interval: Duration::from_secs(self.poll.interval_secs),
            batch_size: self.poll.batch_size,
            context_timeout: match self.session.context_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.poll.fetch_timeout_secs.map(Duration::from_secs)
    }

    pub fn layout(&self) -> FrameLayout {
        FrameLayout {
            title: self.ui.title.clone(),
            content_width: self.ui.content_width,
        }
    }
}
