//! Configuration management for Partyline
//!
//! Configuration comes from a TOML file, from environment variables, or from
//! defaults. Every loader validates before returning.

use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main plugin configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Invite behaviour
    pub invites: InviteConfig,

    /// Chat output
    pub chat: ChatConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Invite behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InviteConfig {
    /// How long an invite stays valid
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Let players accept invites while they are in another group
    pub allow_across_groups: bool,
}

/// Chat output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Six hex digits, with or without a leading `#`
    pub color_hex: String,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            allow_across_groups: false,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            color_hex: "00FFAA".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl ChatConfig {
    /// Colour as `#RRGGBB`
    pub fn color(&self) -> String {
        format!("#{}", self.color_hex.trim_start_matches('#'))
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Recognised variables:
    /// - `PARTYLINE_INVITE_TIMEOUT_SECONDS`
    /// - `PARTYLINE_ALLOW_INVITES_ACROSS_GROUPS`
    /// - `PARTYLINE_CHAT_COLOR`
    /// - `PARTYLINE_LOG_LEVEL`
    /// - `PARTYLINE_LOG_JSON`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup, starting from defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values found by `lookup` onto this configuration
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secs) = lookup("PARTYLINE_INVITE_TIMEOUT_SECONDS") {
            let secs: u64 = secs.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "PARTYLINE_INVITE_TIMEOUT_SECONDS",
                message: format!("{}", e),
            })?;
            self.invites.timeout = Duration::from_secs(secs);
        }
        if let Some(flag) = lookup("PARTYLINE_ALLOW_INVITES_ACROSS_GROUPS") {
            self.invites.allow_across_groups =
                flag.trim().parse().map_err(|e| ConfigError::InvalidValue {
                    key: "PARTYLINE_ALLOW_INVITES_ACROSS_GROUPS",
                    message: format!("{}", e),
                })?;
        }
        if let Some(color) = lookup("PARTYLINE_CHAT_COLOR") {
            self.chat.color_hex = color.trim().to_string();
        }
        if let Some(level) = lookup("PARTYLINE_LOG_LEVEL") {
            self.logging.level = level.trim().to_lowercase();
        }
        if let Some(json) = lookup("PARTYLINE_LOG_JSON") {
            self.logging.json_format =
                json.trim().parse().map_err(|e| ConfigError::InvalidValue {
                    key: "PARTYLINE_LOG_JSON",
                    message: format!("{}", e),
                })?;
        }
        Ok(())
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.invites.timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "invites.timeout must be greater than 0".to_string(),
            ));
        }

        let hex = self.chat.color_hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::ValidationFailed(format!(
                "chat.color_hex must be six hex digits, got {:?}",
                self.chat.color_hex
            )));
        }

        if let Err(e) = self.logging.level.parse::<LogLevel>() {
            return Err(ConfigError::ValidationFailed(e.to_string()));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(())
    }
}
