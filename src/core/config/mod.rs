//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order, first match wins:
//! 1. `$BACKSTROKE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/backstroke/config.toml`
//! 3. `~/.backstroke/config.toml`
//!
//! A missing file is not an error; defaults are used.
//!
//! # Secrets
//!
//! Tokens never live in the file. The file names the environment
//! variables that hold them (`github.token_env`, `bot.token_env`).
//!
//! # Example
//!
//! ```no_run
//! use backstroke::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("page size: {}", config.page_size());
//! println!("bot: {}", config.bot_identity().login);
//! ```

pub mod schema;

pub use schema::{BotConfig, ConfigFile, GitHubConfig, SyncConfig, MAX_PAGE_SIZE};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::types::BotIdentity;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "BACKSTROKE_CONFIG";

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const DEFAULT_BOT_LOGIN: &str = "backstroke-bot";
pub const DEFAULT_BOT_TOKEN_ENV: &str = "BACKSTROKE_BOT_TOKEN";
pub const DEFAULT_PAGE_SIZE: u32 = MAX_PAGE_SIZE;
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_OPT_OUT_LABEL: &str = "optout";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents
    pub file: ConfigFile,
    /// Path the file was loaded from (if any)
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read,
    /// parsed, or validated.
    pub fn load() -> Result<Config, ConfigError> {
        match Self::locate() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        Ok(Config {
            file,
            path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an in-memory configuration (no backing file).
    pub fn from_file(file: ConfigFile) -> Result<Config, ConfigError> {
        file.validate()?;
        Ok(Config { file, path: None })
    }

    /// Find the first existing config file.
    fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("backstroke/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".backstroke/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Get the path the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    fn github(&self) -> Option<&GitHubConfig> {
        self.file.github.as_ref()
    }

    fn bot(&self) -> Option<&BotConfig> {
        self.file.bot.as_ref()
    }

    fn sync(&self) -> Option<&SyncConfig> {
        self.file.sync.as_ref()
    }

    /// GitHub API base URL.
    pub fn api_base(&self) -> &str {
        self.github()
            .and_then(|g| g.api_base.as_deref())
            .unwrap_or(DEFAULT_API_BASE)
    }

    /// Name of the variable holding the link owner's token.
    pub fn github_token_env(&self) -> &str {
        self.github()
            .and_then(|g| g.token_env.as_deref())
            .unwrap_or(DEFAULT_GITHUB_TOKEN_ENV)
    }

    /// The link owner's token, if set.
    pub fn github_token(&self) -> Option<String> {
        read_token(self.github_token_env())
    }

    /// Name of the variable holding the bot's token.
    pub fn bot_token_env(&self) -> &str {
        self.bot()
            .and_then(|b| b.token_env.as_deref())
            .unwrap_or(DEFAULT_BOT_TOKEN_ENV)
    }

    /// The bot's token, if set.
    pub fn bot_token(&self) -> Option<String> {
        read_token(self.bot_token_env())
    }

    /// The bot identity that owns staging copies and opens pull requests.
    pub fn bot_identity(&self) -> BotIdentity {
        BotIdentity {
            login: self
                .bot()
                .and_then(|b| b.login.clone())
                .unwrap_or_else(|| DEFAULT_BOT_LOGIN.to_string()),
            organization: self.bot().and_then(|b| b.organization.clone()),
        }
    }

    /// Forks requested per page.
    pub fn page_size(&self) -> u32 {
        self.sync()
            .and_then(|s| s.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Concurrent per-fork synchronizations within a page.
    pub fn concurrency(&self) -> usize {
        self.sync()
            .and_then(|s| s.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.sync()
                .and_then(|s| s.request_timeout_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Retries for transient provider errors.
    pub fn max_retries(&self) -> u32 {
        self.sync()
            .and_then(|s| s.max_retries)
            .unwrap_or(DEFAULT_MAX_RETRIES)
    }

    /// Label marking a repository as opted out.
    pub fn opt_out_label(&self) -> &str {
        self.sync()
            .and_then(|s| s.opt_out_label.as_deref())
            .unwrap_or(DEFAULT_OPT_OUT_LABEL)
    }
}

/// Read a token from the environment, treating empty values as unset.
fn read_token(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|t| !t.trim().is_empty())
}
