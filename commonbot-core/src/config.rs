// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Resolves config file and log directory locations; platform is validated at adapter construction
use crate::error::BridgeError;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The only platform type this build can drive.
pub const SLACK_PLATFORM: &str = "slack";

/// Explicit config file location; checked before `./config.toml`.
pub const CONFIG_PATH_ENV: &str = "COMMONBOT_CONFIG_PATH";

/// Overrides `[logging] dir`.
pub const LOG_DIR_ENV: &str = "COMMONBOT_LOG_DIR";

const LOG_FILE_PREFIX: &str = "commonbot.log";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "commonbot", "commonbot")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(rename = "type", default = "default_platform_type")]
    pub platform_type: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            platform_type: default_platform_type(),
        }
    }
}

fn default_platform_type() -> String {
    SLACK_PLATFORM.to_string()
}

// ─── LoggingConfig ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the daily rolling log file; defaults to the XDG data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_prefix: default_log_file_prefix(),
        }
    }
}

fn default_log_file_prefix() -> String {
    LOG_FILE_PREFIX.to_string()
}

impl LoggingConfig {
    /// e.g. ~/.local/share/commonbot/logs/, or ./logs without a home directory
    pub fn log_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            project_dirs()
                .map(|p| p.data_dir().join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs"))
        })
    }
}

// ─── SlackConfig ────────────────────────────────────────────────

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    pub app_token: String,
    pub bot_token: String,
    #[serde(default)]
    pub signing_secret: String,
    /// Overrides the bot name reported by auth.test
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_name: Option<String>,
    /// Empty = allow all
    #[serde(default)]
    pub allowed_users: Vec<String>,
    /// Empty = allow all
    #[serde(default)]
    pub allowed_channels: Vec<String>,
}

// Custom Debug impl to redact app_token, bot_token, signing_secret
impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("app_token", &"[REDACTED]")
            .field("bot_token", &"[REDACTED]")
            .field("signing_secret", &"[REDACTED]")
            .field("bot_name", &self.bot_name)
            .field("allowed_users", &self.allowed_users)
            .field("allowed_channels", &self.allowed_channels)
            .finish()
    }
}

impl SlackConfig {
    pub fn is_user_allowed(&self, user_id: &str) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.iter().any(|u| u == user_id)
    }

    pub fn is_channel_allowed(&self, channel_id: &str) -> bool {
        self.allowed_channels.is_empty() || self.allowed_channels.iter().any(|c| c == channel_id)
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Config file candidates, in search order:
    /// 1. COMMONBOT_CONFIG_PATH env var (if set)
    /// 2. ./config.toml
    /// 3. ~/.config/commonbot/config.toml
    pub fn config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Ok(env_path) = std::env::var(CONFIG_PATH_ENV) {
            if !env_path.trim().is_empty() {
                candidates.push(PathBuf::from(env_path));
            }
        }
        candidates.push(PathBuf::from("config.toml"));
        if let Some(dirs) = project_dirs() {
            candidates.push(dirs.config_dir().join("config.toml"));
        }
        candidates
    }

    fn find_config_file() -> Option<PathBuf> {
        Self::config_candidates().into_iter().find(|p| p.exists())
    }

    /// Load configuration from the first config file found, then apply
    /// environment variable overrides.
    pub fn load() -> Result<Self> {
        let config = match Self::find_config_file() {
            Some(path) => Self::read_file(&path)?,
            None => {
                tracing::info!("No config file found, using environment variables and defaults");
                Config::default()
            }
        };
        Ok(config.with_env_overrides())
    }

    /// Load configuration from an explicit path, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self::read_file(path)?.with_env_overrides())
    }

    fn read_file(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "Loading configuration from file");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str::<Config>(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("PLATFORM_TYPE") {
            self.platform.platform_type = val;
        }
        if let Ok(val) = std::env::var(LOG_DIR_ENV) {
            if !val.trim().is_empty() {
                self.logging.dir = Some(PathBuf::from(val));
            }
        }

        // Tokens alone are enough to enable Slack without a [slack] section
        if self.slack.is_none()
            && std::env::var("SLACK_BOT_TOKEN").is_ok()
            && std::env::var("SLACK_APP_TOKEN").is_ok()
        {
            self.slack = Some(SlackConfig::default());
        }

        if let Some(ref mut slack) = self.slack {
            if let Ok(val) = std::env::var("SLACK_APP_TOKEN") {
                slack.app_token = val;
            }
            if let Ok(val) = std::env::var("SLACK_BOT_TOKEN") {
                slack.bot_token = val;
            }
            if let Ok(val) = std::env::var("SLACK_SIGNING_SECRET") {
                slack.signing_secret = val;
            }
            if let Ok(val) = std::env::var("SLACK_BOT_NAME") {
                slack.bot_name = Some(val);
            }
            if let Ok(val) = std::env::var("SLACK_ALLOWED_USERS") {
                slack.allowed_users = split_list(&val);
            }
            if let Ok(val) = std::env::var("SLACK_ALLOWED_CHANNELS") {
                slack.allowed_channels = split_list(&val);
            }
            slack.allowed_users.retain(|s| !s.trim().is_empty());
            slack.allowed_channels.retain(|s| !s.trim().is_empty());
        }

        self
    }

    /// The Slack settings, or a configuration error when the configured
    /// platform is not Slack or required tokens are missing.
    pub fn require_slack(&self) -> Result<&SlackConfig, BridgeError> {
        if !self.platform.platform_type.eq_ignore_ascii_case(SLACK_PLATFORM) {
            return Err(BridgeError::Configuration(format!(
                "platform type '{}' is not supported, expected '{}'",
                self.platform.platform_type, SLACK_PLATFORM
            )));
        }
        let slack = self.slack.as_ref().ok_or_else(|| {
            BridgeError::Configuration(
                "[slack] section is required (or set SLACK_BOT_TOKEN and SLACK_APP_TOKEN)"
                    .to_string(),
            )
        })?;
        if slack.bot_token.trim().is_empty() {
            return Err(BridgeError::Configuration(
                "slack.bot_token is required (set in config.toml or SLACK_BOT_TOKEN env var)"
                    .to_string(),
            ));
        }
        if slack.app_token.trim().is_empty() {
            return Err(BridgeError::Configuration(
                "slack.app_token is required (set in config.toml or SLACK_APP_TOKEN env var)"
                    .to_string(),
            ));
        }
        Ok(slack)
    }
}
