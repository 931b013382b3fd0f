//! forge::factory
//!
//! Provider resolution and the per-provider client registry.
//!
//! # Design
//!
//! Repository references name their provider as a plain string. This module
//! is the only place that string is turned into something callable: first
//! into a [`ForgeProvider`] (a closed set), then into the [`ForgeClients`]
//! registered for it in [`Forges`]. Both steps fail with a
//! [`ResolveError`], which the engine reports as a configuration error
//! rather than a provider error.
//!
//! # Credentials
//!
//! Each provider carries two clients:
//! - `user`: the link owner's credentials (opt-out searches, branch
//!   lookups, fork listings)
//! - `bot`: the bot's credentials (staging copies, pull requests)
//!
//! The bot client is optional so read-only commands work with only the
//! owner's token; the dispatcher insists on it before any call is made.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use backstroke::forge::mock::MockForge;
//! use backstroke::forge::{ForgeClients, ForgeProvider, Forges};
//!
//! let forges = Forges::new().with(
//!     ForgeProvider::GitHub,
//!     ForgeClients::shared(Arc::new(MockForge::new())),
//! );
//! assert!(forges.resolve("GitHub").is_ok());
//! assert!(forges.resolve("gitlab").is_err());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::github::{GitHubForge, GitHubOptions};
use super::traits::{Forge, ForgeError};
use crate::core::config::Config;

/// Provider names that are recognized but have no implementation.
const KNOWN_UNIMPLEMENTED: &[&str] = &["gitlab", "bitbucket"];

/// Supported forge providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForgeProvider {
    GitHub,
}

impl ForgeProvider {
    /// Get all implemented providers.
    ///
    /// # Example
    ///
    /// ```
    /// use backstroke::forge::ForgeProvider;
    ///
    /// assert!(ForgeProvider::all().contains(&ForgeProvider::GitHub));
    /// ```
    pub fn all() -> &'static [ForgeProvider] {
        &[ForgeProvider::GitHub]
    }

    /// Get the provider name as it appears in repository references.
    pub fn name(&self) -> &'static str {
        match self {
            ForgeProvider::GitHub => "github",
        }
    }

    /// Parse a provider name, ignoring case.
    ///
    /// # Example
    ///
    /// ```
    /// use backstroke::forge::ForgeProvider;
    ///
    /// assert_eq!(ForgeProvider::parse("GitHub"), Some(ForgeProvider::GitHub));
    /// assert_eq!(ForgeProvider::parse("gitlab"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "github" => Some(ForgeProvider::GitHub),
            _ => None,
        }
    }

    /// Resolve a provider name, distinguishing unknown names from
    /// recognized but unimplemented ones.
    ///
    /// # Errors
    ///
    /// `ResolveError::Unsupported` for any name that is not implemented.
    pub fn resolve(name: &str) -> Result<Self, ResolveError> {
        Self::parse(name).ok_or_else(|| ResolveError::Unsupported {
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for ForgeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Whether a provider name is recognized but not implemented.
pub fn is_known_but_unimplemented(name: &str) -> bool {
    KNOWN_UNIMPLEMENTED.contains(&name.to_lowercase().as_str())
}

/// Comma-separated list of implemented provider names.
pub fn available_providers() -> String {
    ForgeProvider::all()
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parenthetical for an unsupported provider name in error messages.
///
/// ```
/// use backstroke::forge::unsupported_reason;
///
/// assert_eq!(unsupported_reason("sourcehut"), "available: github");
/// assert!(unsupported_reason("gitlab").starts_with("recognized but not implemented"));
/// ```
pub fn unsupported_reason(name: &str) -> String {
    if is_known_but_unimplemented(name) {
        format!(
            "recognized but not implemented; available: {}",
            available_providers()
        )
    } else {
        format!("available: {}", available_providers())
    }
}

/// Which set of credentials a client carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    User,
    Bot,
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::User => f.write_str("user"),
            Credential::Bot => f.write_str("bot"),
        }
    }
}

/// Errors from turning a provider name into clients.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unsupported provider '{name}' ({})", unsupported_reason(.name))]
    Unsupported { name: String },

    #[error("provider '{provider}' has no {credential} credentials configured")]
    NotConfigured {
        provider: ForgeProvider,
        credential: Credential,
    },
}

/// The clients used to reach one provider.
#[derive(Clone)]
pub struct ForgeClients {
    provider: ForgeProvider,
    user: Arc<dyn Forge>,
    bot: Option<Arc<dyn Forge>>,
}

impl std::fmt::Debug for ForgeClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForgeClients")
            .field("provider", &self.provider)
            .field("user", &self.user.name())
            .field("bot", &self.bot.as_ref().map(|b| b.name()))
            .finish()
    }
}

impl ForgeClients {
    /// Clients with separate user and bot credentials.
    pub fn new(user: Arc<dyn Forge>, bot: Arc<dyn Forge>) -> Self {
        Self {
            provider: ForgeProvider::GitHub,
            user,
            bot: Some(bot),
        }
    }

    /// Clients with only the link owner's credentials.
    pub fn user_only(user: Arc<dyn Forge>) -> Self {
        Self {
            provider: ForgeProvider::GitHub,
            user,
            bot: None,
        }
    }

    /// One client serving both roles. Used with the mock forge.
    pub fn shared(forge: Arc<dyn Forge>) -> Self {
        Self::new(Arc::clone(&forge), forge)
    }

    /// The provider these clients reach.
    pub fn provider(&self) -> ForgeProvider {
        self.provider
    }

    /// The link owner's client.
    pub fn user(&self) -> &Arc<dyn Forge> {
        &self.user
    }

    /// The bot's client.
    ///
    /// # Errors
    ///
    /// `ResolveError::NotConfigured` if no bot credentials were provided.
    pub fn bot(&self) -> Result<&Arc<dyn Forge>, ResolveError> {
        self.bot.as_ref().ok_or(ResolveError::NotConfigured {
            provider: self.provider,
            credential: Credential::Bot,
        })
    }
}

/// Registry of clients per provider.
#[derive(Debug, Clone, Default)]
pub struct Forges {
    clients: HashMap<ForgeProvider, ForgeClients>,
}

impl Forges {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register clients for a provider.
    pub fn with(mut self, provider: ForgeProvider, mut clients: ForgeClients) -> Self {
        clients.provider = provider;
        self.clients.insert(provider, clients);
        self
    }

    /// Build the registry from configuration and environment tokens.
    ///
    /// A provider without the owner's token is left unregistered; a missing
    /// bot token registers a user-only entry.
    ///
    /// # Errors
    ///
    /// Returns a `ForgeError` if an HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, ForgeError> {
        let mut forges = Forges::new();

        let Some(user_token) = config.github_token() else {
            tracing::debug!(
                env = config.github_token_env(),
                "no GitHub token in environment"
            );
            return Ok(forges);
        };

        let options = GitHubOptions {
            api_base: config.api_base().to_string(),
            timeout: config.request_timeout(),
            max_retries: config.max_retries(),
            ..Default::default()
        };

        let user: Arc<dyn Forge> = Arc::new(GitHubForge::new(user_token, options.clone())?);
        let clients = match config.bot_token() {
            Some(bot_token) => {
                ForgeClients::new(user, Arc::new(GitHubForge::new(bot_token, options)?))
            }
            None => {
                tracing::debug!(env = config.bot_token_env(), "no bot token in environment");
                ForgeClients::user_only(user)
            }
        };

        forges = forges.with(ForgeProvider::GitHub, clients);
        Ok(forges)
    }

    /// Look up the clients for a provider name.
    ///
    /// # Errors
    ///
    /// - `ResolveError::Unsupported` if the name is not an implemented provider
    /// - `ResolveError::NotConfigured` if the provider has no clients registered
    pub fn resolve(&self, name: &str) -> Result<&ForgeClients, ResolveError> {
        let provider = ForgeProvider::resolve(name)?;
        self.clients
            .get(&provider)
            .ok_or(ResolveError::NotConfigured {
                provider,
                credential: Credential::User,
            })
    }

    /// Whether any clients are registered for `provider`.
    pub fn is_configured(&self, provider: ForgeProvider) -> bool {
        self.clients.contains_key(&provider)
    }
}
