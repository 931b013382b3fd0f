//! engine::error
//!
//! Error taxonomy for synchronization runs.
//!
//! # Classes
//!
//! - Configuration errors: the link or the environment cannot be acted
//!   on. Detected before any provider call and never retried.
//! - Provider errors: a gateway call failed.
//! - Cancellation: the caller stopped the run.
//!
//! Duplicate pull requests and opt-outs are not errors; they are
//! [`SyncOutcome`](super::SyncOutcome) values.

use thiserror::Error;

use crate::core::types::TypeError;
use crate::forge::{unsupported_reason, ForgeError, ResolveError};

/// Errors from a synchronization run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// The link's `type` is neither `repo` nor `fork-all`.
    #[error("unsupported target type '{0}' (expected 'repo' or 'fork-all')")]
    UnsupportedTargetType(String),

    /// The provider name is not implemented.
    #[error("unsupported provider '{0}' ({})", unsupported_reason(.0))]
    UnsupportedProvider(String),

    /// The provider is supported but credentials for it are missing.
    #[error("provider '{provider}' has no {credential} credentials configured")]
    ProviderNotConfigured { provider: String, credential: String },

    /// A repository reference cannot be turned into an identity or branch.
    #[error("invalid repository reference: {0}")]
    InvalidRepository(#[from] TypeError),

    /// A gateway call failed.
    #[error("provider error: {0}")]
    Provider(#[from] ForgeError),

    /// Listing a page of forks failed; earlier pages were fully processed.
    #[error("listing forks failed on page {page} after {processed} forks: {source}")]
    ForkListing {
        page: u32,
        processed: u64,
        #[source]
        source: ForgeError,
    },

    /// The run was cancelled before it finished.
    #[error("run cancelled after {processed} forks")]
    Cancelled { processed: u64 },
}

impl SyncError {
    /// Whether this error is configuration-class: detected without calling
    /// a provider, and never worth retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SyncError::UnsupportedTargetType(_)
                | SyncError::UnsupportedProvider(_)
                | SyncError::ProviderNotConfigured { .. }
                | SyncError::InvalidRepository(_)
        )
    }

    /// Whether rerunning the link could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Provider(e) | SyncError::ForkListing { source: e, .. } => e.is_transient(),
            _ => false,
        }
    }
}

impl From<ResolveError> for SyncError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Unsupported { name } => SyncError::UnsupportedProvider(name),
            ResolveError::NotConfigured {
                provider,
                credential,
            } => SyncError::ProviderNotConfigured {
                provider: provider.to_string(),
                credential: credential.to_string(),
            },
        }
    }
}
