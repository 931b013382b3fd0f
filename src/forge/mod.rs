//! forge
//!
//! Provider gateway: the only path from the engine to a hosting provider.
//!
//! # Architecture
//!
//! The [`Forge`] trait defines the capabilities synchronization needs.
//! The engine never names a concrete implementation; it resolves a
//! provider name through [`Forges`] and talks to the returned clients.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub implementation over the REST API
//! - [`mock`]: In-memory implementation for deterministic testing
//! - `factory`: Provider resolution and the client registry
//!
//! # Example
//!
//! ```ignore
//! use backstroke::core::config::Config;
//! use backstroke::forge::Forges;
//!
//! let forges = Forges::from_config(&Config::load()?)?;
//! let clients = forges.resolve("github")?;
//! let sha = clients.user().get_branch_head(&repo, "main").await?;
//! ```

mod factory;
pub mod github;
pub mod mock;
mod traits;

pub use factory::{
    available_providers, is_known_but_unimplemented, unsupported_reason, Credential,
    ForgeClients, ForgeProvider, Forges, ResolveError,
};
pub use traits::*;
