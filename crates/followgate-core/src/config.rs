use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub popup: PopupConfig,
    #[serde(default)]
    pub opener: OpenerConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Floor for `poll_interval_ms`; a zero interval would keep the page loop busy.
pub const MIN_POLL_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopupConfig {
    #[serde(default = "PopupConfig::default_url")]
    pub url: String,
    #[serde(default = "PopupConfig::default_width")]
    pub width: u32,
    #[serde(default = "PopupConfig::default_height")]
    pub height: u32,
    #[serde(default = "PopupConfig::default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "PopupConfig::default_settle_delay")]
    pub settle_delay_ms: u64,
    /// Launcher argv. `{url}`, `{width}`, `{height}`, `{left}` and `{top}`
    /// are substituted per open.
    #[serde(default = "PopupConfig::default_command")]
    pub command: Vec<String>,
}

impl PopupConfig {
    fn default_url() -> String { "https://intern-insta-login.netlify.app/".into() }
    fn default_width() -> u32 { 500 }
    fn default_height() -> u32 { 600 }
    fn default_poll_interval() -> u64 { 1000 }
    fn default_settle_delay() -> u64 { 2000 }
    fn default_command() -> Vec<String> {
        vec![
            "chromium".into(),
            "--app={url}".into(),
            "--window-size={width},{height}".into(),
            "--window-position={left},{top}".into(),
        ]
    }

    /// Closure sampling interval, never shorter than [`MIN_POLL_INTERVAL_MS`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            width: 500,
            height: 600,
            poll_interval_ms: 1000,
            settle_delay_ms: 2000,
            command: Self::default_command(),
        }
    }
}

/// Screen rectangle of the opener window; the popup is centred on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenerConfig {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default = "OpenerConfig::default_width")]
    pub width: u32,
    #[serde(default = "OpenerConfig::default_height")]
    pub height: u32,
}

impl OpenerConfig {
    fn default_width() -> u32 { 1280 }
    fn default_height() -> u32 { 800 }
}

impl Default for OpenerConfig {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 1280,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "NotificationConfig::default_welcome_delay")]
    pub welcome_delay_ms: u64,
    #[serde(default = "NotificationConfig::default_welcome")]
    pub welcome_ms: u64,
    #[serde(default = "NotificationConfig::default_reminder_delay")]
    pub reminder_delay_ms: u64,
    #[serde(default = "NotificationConfig::default_reminder")]
    pub reminder_ms: u64,
    #[serde(default = "NotificationConfig::default_success")]
    pub success_ms: u64,
    #[serde(default = "NotificationConfig::default_closed_warning")]
    pub closed_warning_ms: u64,
}

impl NotificationConfig {
    fn default_welcome_delay() -> u64 { 1000 }
    fn default_welcome() -> u64 { 4000 }
    fn default_reminder_delay() -> u64 { 10_000 }
    fn default_reminder() -> u64 { 6000 }
    fn default_success() -> u64 { 5000 }
    fn default_closed_warning() -> u64 { 8000 }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            welcome_delay_ms: 1000,
            welcome_ms: 4000,
            reminder_delay_ms: 10_000,
            reminder_ms: 6000,
            success_ms: 5000,
            closed_warning_ms: 8000,
        }
    }
}

impl Config {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("followgate")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&contents).with_context(|| "parsing config TOML")
    }
}

pub fn socket_path() -> PathBuf {
    // FOLLOWGATE_SOCK overrides for testing and for running several pages side by side.
    if let Ok(path) = std::env::var("FOLLOWGATE_SOCK") {
        return PathBuf::from(path);
    }
    dirs::runtime_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("followgate.sock")
}
