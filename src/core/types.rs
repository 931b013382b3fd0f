//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RepoId`] - `owner/repo` pair addressing a repository on a provider
//! - [`RepoRef`] - Repository reference as received from the link layer
//! - [`TargetKind`] - Closed set of link target types
//! - [`Link`] - A synchronization relationship between upstream and downstream
//! - [`BranchName`] - Validated Git branch name
//! - [`BotIdentity`] - The account that owns staging copies and opens PRs
//!
//! # Validation
//!
//! `RepoRef` mirrors the loosely-typed shape the link layer hands us, so
//! its fields are plain strings. Everything derived from it ([`RepoId`],
//! [`BranchName`], [`TargetKind`]) is validated at construction time.
//!
//! # Examples
//!
//! ```
//! use backstroke::core::types::{BranchName, RepoId};
//!
//! let id = RepoId::parse("octocat/hello-world").unwrap();
//! assert_eq!(id.owner(), "octocat");
//! assert_eq!(id.to_string(), "octocat/hello-world");
//!
//! assert!(BranchName::new("main").is_ok());
//! assert!(BranchName::new("invalid..name").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid repository name: {0}")]
    InvalidRepoName(String),

    #[error("repository reference has no branch")]
    MissingBranch,
}

/// An `owner/repo` pair.
///
/// This is the identity of a repository on a provider. Both components
/// are non-empty and contain no `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoId {
    owner: String,
    repo: String,
}

impl RepoId {
    /// Create a repository id from its two components.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepoName` if either component is empty
    /// or contains a `/` or whitespace.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Result<Self, TypeError> {
        let owner = owner.into();
        let repo = repo.into();
        for part in [&owner, &repo] {
            if part.is_empty() || part.contains('/') || part.chars().any(char::is_whitespace) {
                return Err(TypeError::InvalidRepoName(format!("{}/{}", owner, repo)));
            }
        }
        Ok(Self { owner, repo })
    }

    /// Parse a canonical `owner/repo` string.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepoName` unless the string has exactly
    /// one `/` separating two valid components.
    pub fn parse(full_name: &str) -> Result<Self, TypeError> {
        match full_name.split_once('/') {
            Some((owner, repo)) => Self::new(owner, repo)
                .map_err(|_| TypeError::InvalidRepoName(full_name.to_string())),
            None => Err(TypeError::InvalidRepoName(full_name.to_string())),
        }
    }

    /// The owning account (user or organization).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl TryFrom<String> for RepoId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepoId> for String {
    fn from(id: RepoId) -> Self {
        id.to_string()
    }
}

/// Link target types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// A single named repository.
    Repo,
    /// Every fork of the link's upstream.
    ForkAll,
}

impl TargetKind {
    /// Parse a target type as it appears in the `type` field.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "repo" => Some(TargetKind::Repo),
            "fork-all" => Some(TargetKind::ForkAll),
            _ => None,
        }
    }

    /// The wire name of this target type.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Repo => "repo",
            TargetKind::ForkAll => "fork-all",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_kind() -> String {
    TargetKind::Repo.as_str().to_string()
}

/// A repository reference.
///
/// Accepts both the split `owner` + `repo` form and the canonical `name`
/// form (`"owner/repo"`). When both are present the split form wins.
///
/// # Example
///
/// ```
/// use backstroke::core::types::RepoRef;
///
/// let by_name: RepoRef = serde_json::from_str(
///     r#"{"type": "repo", "provider": "github", "name": "octocat/hello", "branch": "main"}"#,
/// ).unwrap();
/// let split: RepoRef = serde_json::from_str(
///     r#"{"type": "repo", "provider": "github", "owner": "octocat", "repo": "hello", "branch": "main"}"#,
/// ).unwrap();
/// assert_eq!(by_name.id().unwrap(), split.id().unwrap());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoRef {
    /// Target type (`repo` or `fork-all`). Kept as a string so an unknown
    /// value surfaces as a dispatch error naming it.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,

    /// Provider name (e.g. `github`).
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// Canonical `owner/repo` name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Branch pull requests are proposed against (or read from, upstream).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Known branches. Informational only.
    #[serde(default)]
    pub branches: Vec<String>,

    #[serde(default)]
    pub private: bool,

    #[serde(default)]
    pub fork: bool,
}

impl RepoRef {
    /// Build a single-repository reference.
    pub fn repo(provider: impl Into<String>, id: &RepoId, branch: impl Into<String>) -> Self {
        Self {
            kind: default_kind(),
            provider: provider.into(),
            owner: Some(id.owner().to_string()),
            repo: Some(id.repo().to_string()),
            name: Some(id.to_string()),
            branch: Some(branch.into()),
            ..Default::default()
        }
    }

    /// Build a fan-out reference targeting every fork of the upstream.
    pub fn fork_all(provider: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::ForkAll.as_str().to_string(),
            provider: provider.into(),
            ..Default::default()
        }
    }

    /// Derive the `owner/repo` identity.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepoName` when neither the split form
    /// nor the canonical name yields a valid identity.
    pub fn id(&self) -> Result<RepoId, TypeError> {
        match (&self.owner, &self.repo, &self.name) {
            (Some(owner), Some(repo), _) => RepoId::new(owner.as_str(), repo.as_str()),
            (_, _, Some(name)) => RepoId::parse(name),
            _ => Err(TypeError::InvalidRepoName(
                "reference has neither owner/repo nor name".to_string(),
            )),
        }
    }

    /// The validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::MissingBranch` if no branch is set, or
    /// `TypeError::InvalidBranchName` if it is not a valid branch.
    pub fn branch_name(&self) -> Result<BranchName, TypeError> {
        match &self.branch {
            Some(branch) => BranchName::new(branch.as_str()),
            None => Err(TypeError::MissingBranch),
        }
    }

    /// The parsed target type, if known.
    pub fn target_kind(&self) -> Option<TargetKind> {
        TargetKind::parse(&self.kind)
    }
}

/// A synchronization relationship.
///
/// A link is actionable only when it is enabled and both `from` and `to`
/// are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Display name, used in logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub enabled: bool,

    /// Upstream repository.
    #[serde(default)]
    pub from: Option<RepoRef>,

    /// Downstream repository, or a `fork-all` marker.
    #[serde(default)]
    pub to: Option<RepoRef>,
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
///
/// The `:` rule matters here beyond Git: pull request heads are written
/// as `owner:branch`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be empty".into(),
            ));
        }
        if name == "@" {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be '@' (reserved)".into(),
            ));
        }
        if name.starts_with('.') || name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot start with '{}'",
                &name[..1]
            )));
        }
        if name.ends_with(".lock") || name.ends_with('/') {
            return Err(TypeError::InvalidBranchName(format!(
                "'{}' has an invalid suffix",
                name
            )));
        }
        for seq in ["..", "@{", "//"] {
            if name.contains(seq) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{}'",
                    seq
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        for c in INVALID_CHARS {
            if name.contains(c) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{c}'"
                )));
            }
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot contain control characters".into(),
            ));
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The bot account that owns staging copies and opens pull requests.
///
/// Credentials are not part of the identity; they live in the bot's
/// forge client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    /// The bot's login.
    pub login: String,
    /// Organization to create staging copies under, if not the bot's
    /// own account.
    pub organization: Option<String>,
}

impl BotIdentity {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            organization: None,
        }
    }

    /// Account that ends up owning staging copies.
    pub fn staging_owner(&self) -> &str {
        self.organization.as_deref().unwrap_or(&self.login)
    }
}
