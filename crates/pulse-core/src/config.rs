use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PulseError, Result};

/// Top-level application configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub output: OutputConfig,
    pub report: ReportConfig,
}

impl AppConfig {
    /// Load configuration from the default path (~/.config/slack-pulse/config.toml),
    /// falling back to defaults if the file doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Write current configuration to the default path.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;
        Ok(())
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slack-pulse")
            .join("config.toml")
    }
}

/// Slack Web API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Base URL of the Web API (methods are appended as path segments).
    pub api_base: String,
    /// Bot or user token. Takes precedence over `token_env`.
    pub token: Option<String>,
    /// Environment variable holding the token.
    pub token_env: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum messages fetched per channel (single page).
    pub history_limit: u32,
    /// Maximum channels listed.
    pub channel_limit: u32,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_base: "https://slack.com/api".into(),
            token: None,
            token_env: "SLACK_API_TOKEN".into(),
            timeout_secs: 30,
            history_limit: 1000,
            channel_limit: 1000,
        }
    }
}

impl SlackConfig {
    /// Resolve the API token from config or the environment.
    pub fn resolve_token(&self) -> Result<String> {
        if let Some(token) = self.token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(token.clone());
        }
        match std::env::var(&self.token_env) {
            Ok(token) if !token.is_empty() => Ok(token),
            _ => Err(PulseError::Config(format!(
                "No Slack token: set slack.token or the {} environment variable",
                self.token_env
            ))),
        }
    }
}

/// Export locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the snapshot and CSV files.
    pub dir: PathBuf,
    pub snapshot_file: String,
    pub directory_file: String,
    pub channel_file: String,
    pub user_file: String,
    pub timeline_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./data"),
            snapshot_file: "messages.json".into(),
            directory_file: "directory.json".into(),
            channel_file: "channel_out.csv".into(),
            user_file: "user_out.csv".into(),
            timeline_file: "timeline_out.csv".into(),
        }
    }
}

impl OutputConfig {
    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(&self.snapshot_file)
    }

    pub fn directory_path(&self) -> PathBuf {
        self.dir.join(&self.directory_file)
    }

    pub fn channel_path(&self) -> PathBuf {
        self.dir.join(&self.channel_file)
    }

    pub fn user_path(&self) -> PathBuf {
        self.dir.join(&self.user_file)
    }

    pub fn timeline_path(&self) -> PathBuf {
        self.dir.join(&self.timeline_file)
    }
}

/// Aggregation and reporting options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Offset from UTC, in hours, that defines calendar-day boundaries.
    pub utc_offset_hours: i32,
    /// First day of the per-day timeline. No timeline is exported when unset.
    pub timeline_since: Option<NaiveDate>,
    /// Number of channels and users listed in the console summary.
    pub top_n: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 9,
            timeline_since: None,
            top_n: 5,
        }
    }
}
