//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! [github]
//! api_base = "https://api.github.com"
//! token_env = "GITHUB_TOKEN"
//!
//! [bot]
//! login = "backstroke-bot"
//! token_env = "BACKSTROKE_BOT_TOKEN"
//!
//! [sync]
//! page_size = 100
//! concurrency = 8
//! request_timeout_secs = 30
//! max_retries = 2
//! opt_out_label = "optout"
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing. Every field is optional; accessors
//! on [`super::Config`] fill in defaults.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Largest page GitHub will return for fork listings.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// GitHub connection settings (link owner's credentials)
    pub github: Option<GitHubConfig>,

    /// Bot identity settings
    pub bot: Option<BotConfig>,

    /// Synchronization tuning
    pub sync: Option<SyncConfig>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(github) = &self.github {
            github.validate()?;
        }
        if let Some(bot) = &self.bot {
            bot.validate()?;
        }
        if let Some(sync) = &self.sync {
            sync.validate()?;
        }
        Ok(())
    }
}

/// GitHub connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubConfig {
    /// API base URL (override for GitHub Enterprise)
    pub api_base: Option<String>,

    /// Environment variable holding the link owner's token
    pub token_env: Option<String>,
}

impl GitHubConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base) = &self.api_base {
            if !(base.starts_with("https://") || base.starts_with("http://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "github.api_base must be an http(s) URL, got '{}'",
                    base
                )));
            }
        }
        validate_env_name("github.token_env", self.token_env.as_deref())
    }
}

/// Bot identity settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
    /// Bot account login
    pub login: Option<String>,

    /// Organization that owns staging copies (defaults to the bot account)
    pub organization: Option<String>,

    /// Environment variable holding the bot's token
    pub token_env: Option<String>,
}

impl BotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("bot.login", &self.login),
            ("bot.organization", &self.organization),
        ] {
            if let Some(value) = value {
                if value.is_empty() || value.contains('/') {
                    return Err(ConfigError::InvalidValue(format!(
                        "{} must be a bare account name, got '{}'",
                        field, value
                    )));
                }
            }
        }
        validate_env_name("bot.token_env", self.token_env.as_deref())
    }
}

/// Synchronization tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Forks requested per page (1..=100)
    pub page_size: Option<u32>,

    /// Maximum concurrent per-fork synchronizations within a page
    pub concurrency: Option<usize>,

    /// Timeout applied to every provider request
    pub request_timeout_secs: Option<u64>,

    /// Retries for transient provider errors
    pub max_retries: Option<u32>,

    /// Label marking a repository as opted out
    pub opt_out_label: Option<String>,
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(size) = self.page_size {
            if size == 0 || size > MAX_PAGE_SIZE {
                return Err(ConfigError::InvalidValue(format!(
                    "sync.page_size must be between 1 and {}, got {}",
                    MAX_PAGE_SIZE, size
                )));
            }
        }
        if self.concurrency == Some(0) {
            return Err(ConfigError::InvalidValue(
                "sync.concurrency must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "sync.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if let Some(label) = &self.opt_out_label {
            if label.trim().is_empty() || label.contains('"') {
                return Err(ConfigError::InvalidValue(format!(
                    "sync.opt_out_label must be non-empty and free of '\"', got '{}'",
                    label
                )));
            }
        }
        Ok(())
    }
}

fn validate_env_name(field: &str, name: Option<&str>) -> Result<(), ConfigError> {
    if let Some(name) = name {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(ConfigError::InvalidValue(format!(
                "{} must be an environment variable name, got '{}'",
                field, name
            )));
        }
    }
    Ok(())
}
