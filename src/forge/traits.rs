//! forge::traits
//!
//! Forge trait definition for interacting with remote hosting services.
//!
//! # Design
//!
//! The `Forge` trait is async because every operation is network I/O, and
//! each call is the only point where a synchronization run suspends.
//! Unlike a per-repository client, a forge here is bound to a set of
//! credentials, not to a repository: every method names the repository
//! it acts on.
//!
//! # Example
//!
//! ```ignore
//! use backstroke::forge::{Forge, CreatePrRequest};
//!
//! async fn open(forge: &dyn Forge, repo: RepoId) -> Result<(), ForgeError> {
//!     let pr = forge.create_pull_request(CreatePrRequest {
//!         repo,
//!         head: "backstroke-bot:main".to_string(),
//!         base: "main".to_string(),
//!         title: "Update from upstream repo up/stream".to_string(),
//!         body: String::new(),
//!     }).await?;
//!     println!("Created PR #{}: {}", pr.number, pr.url);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::core::types::{BotIdentity, RepoId};

/// Errors from forge operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// The provider refused the request as unprocessable. For pull request
    /// creation this is how GitHub reports that the PR already exists.
    #[error("unprocessable: {0}")]
    Unprocessable(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),
}

impl ForgeError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ForgeError::RateLimited | ForgeError::NetworkError(_) | ForgeError::Timeout(_) => true,
            ForgeError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether this is the provider's duplicate pull request signal.
    ///
    /// GitHub answers 422 both for "a pull request already exists" and
    /// for "no commits between"; either way there is nothing new to open.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ForgeError::Unprocessable(_))
    }
}

/// Request to create a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePrRequest {
    /// Repository the pull request is opened against
    pub repo: RepoId,
    /// Head in `owner:branch` form
    pub head: String,
    /// Base branch name (the branch to merge into)
    pub base: String,
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: String,
}

/// Pull request information returned from the forge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR URL (web URL for viewing)
    pub url: String,
    /// Head ref name
    pub head: String,
    /// Base branch name
    pub base: String,
    /// PR title
    pub title: String,
}

/// One entry of a fork listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkSummary {
    /// The fork's identity
    pub id: RepoId,
    /// Whether the fork is private
    pub private: bool,
}

/// A bot-owned copy of an upstream repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagingRepo {
    /// Owning account (the bot or its organization)
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Web page of the copy, when the provider reports one
    pub url: Option<String>,
}

impl StagingRepo {
    /// The staging copy's identity, if its parts are valid.
    pub fn id(&self) -> Result<RepoId, crate::core::types::TypeError> {
        RepoId::new(self.owner.as_str(), self.name.as_str())
    }
}

/// The Forge trait for interacting with remote hosting services.
///
/// One implementation exists per supported provider. Synchronization only
/// ever reaches a provider through this trait.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; per-fork synchronizations share
/// one forge across concurrent tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers should handle:
/// - `Unprocessable` from `create_pull_request`: the PR already exists
/// - `RateLimited` / `NetworkError` / `Timeout`: transient, may be retried
/// - everything else: report as a provider error
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Search issues and pull requests.
    ///
    /// # Returns
    ///
    /// The total number of matches.
    async fn search_issues(&self, query: &str) -> Result<u64, ForgeError>;

    /// Get the commit a branch points at.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the repository or branch doesn't exist
    async fn get_branch_head(&self, repo: &RepoId, branch: &str) -> Result<String, ForgeError>;

    /// List one page of a repository's forks.
    ///
    /// # Arguments
    ///
    /// * `repo` - Repository whose forks are listed
    /// * `page` - Zero-based page index
    /// * `per_page` - Requested page size
    ///
    /// # Returns
    ///
    /// Up to `per_page` forks, in the provider's order. A short page means
    /// there are no further pages.
    async fn list_forks(
        &self,
        repo: &RepoId,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ForkSummary>, ForgeError>;

    /// Create a new pull request.
    ///
    /// # Errors
    ///
    /// - `Unprocessable` if the provider rejects the request, most often
    ///   because an identical pull request is already open
    async fn create_pull_request(&self, request: CreatePrRequest)
        -> Result<PullRequest, ForgeError>;

    /// Create (or return the existing) bot-owned copy of `source`.
    async fn create_staging_repo(
        &self,
        source: &RepoId,
        bot: &BotIdentity,
    ) -> Result<StagingRepo, ForgeError>;

    /// Point `branch` in `repo` at `sha`, creating the branch if needed.
    ///
    /// The move is forced: staging branches mirror upstream and carry no
    /// work of their own.
    async fn update_branch(&self, repo: &RepoId, branch: &str, sha: &str)
        -> Result<(), ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forge_error_display() {
        assert_eq!(
            format!("{}", ForgeError::AuthRequired),
            "authentication required"
        );
        assert_eq!(
            format!("{}", ForgeError::AuthFailed("expired token".into())),
            "authentication failed: expired token"
        );
        assert_eq!(
            format!("{}", ForgeError::NotFound("branch main".into())),
            "not found: branch main"
        );
        assert_eq!(format!("{}", ForgeError::RateLimited), "rate limited");
        assert_eq!(
            format!(
                "{}",
                ForgeError::Unprocessable("A pull request already exists".into())
            ),
            "unprocessable: A pull request already exists"
        );
        assert_eq!(
            format!(
                "{}",
                ForgeError::ApiError {
                    status: 500,
                    message: "boom".into()
                }
            ),
            "API error: 500 - boom"
        );
        assert_eq!(
            format!("{}", ForgeError::Timeout("GET /forks".into())),
            "request timed out: GET /forks"
        );
    }

    #[test]
    fn transient_classification() {
        assert!(ForgeError::RateLimited.is_transient());
        assert!(ForgeError::NetworkError("reset".into()).is_transient());
        assert!(ForgeError::Timeout("slow".into()).is_transient());
        assert!(ForgeError::ApiError {
            status: 502,
            message: "bad gateway".into()
        }
        .is_transient());

        assert!(!ForgeError::ApiError {
            status: 400,
            message: "bad request".into()
        }
        .is_transient());
        assert!(!ForgeError::NotFound("x".into()).is_transient());
        assert!(!ForgeError::Unprocessable("dup".into()).is_transient());
        assert!(!ForgeError::AuthFailed("no".into()).is_transient());
    }

    #[test]
    fn duplicate_classification() {
        assert!(ForgeError::Unprocessable("dup".into()).is_duplicate());
        assert!(!ForgeError::ApiError {
            status: 409,
            message: "conflict".into()
        }
        .is_duplicate());
        assert!(!ForgeError::RateLimited.is_duplicate());
    }

    #[test]
    fn staging_repo_id() {
        let staging = StagingRepo {
            owner: "backstroke-bot".into(),
            name: "stream".into(),
            url: None,
        };
        assert_eq!(staging.id().unwrap().to_string(), "backstroke-bot/stream");
    }
}
