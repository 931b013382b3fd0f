//! engine::pull_request
//!
//! The per-target workflow: opt-out check, staging copy, pull request.
//!
//! # Outcomes
//!
//! | Provider behavior | Result |
//! |---|---|
//! | target carries the opt-out label | `Ok(OptedOut)`, nothing else called |
//! | pull request opened | `Ok(PullRequestCreated)` |
//! | creation rejected as unprocessable | `Ok(AlreadyExists)` |
//! | any other failure | `Err(SyncError::Provider)` |
//!
//! Single-target runs propagate the error; the fork enumerator turns it
//! into a per-fork `ProviderError` outcome.

use crate::core::types::{BotIdentity, BranchName, RepoId, RepoRef};
use crate::forge::{CreatePrRequest, ForgeClients, StagingRepo};

use super::{opt_out, staging, SyncError, SyncOutcome};

/// A repository and branch, validated from a [`RepoRef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub repo: RepoId,
    pub branch: BranchName,
}

impl Endpoint {
    pub fn new(repo: RepoId, branch: BranchName) -> Self {
        Self { repo, branch }
    }

    /// Validate a reference into an endpoint.
    ///
    /// # Errors
    ///
    /// `SyncError::InvalidRepository` if the identity cannot be derived or
    /// the branch is missing or invalid.
    pub fn from_ref(r: &RepoRef) -> Result<Self, SyncError> {
        Ok(Self {
            repo: r.id()?,
            branch: r.branch_name()?,
        })
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.repo, self.branch)
    }
}

/// Title of the pull request proposing `upstream`'s changes.
pub fn pr_title(upstream: &RepoId) -> String {
    format!("Update from upstream repo {}", upstream)
}

/// Body of the pull request proposing `upstream`'s changes.
///
/// Names the upstream as `` `owner/repo` `` and the staging copy as
/// `` `owner/name` ``, linked to the page the provider reported for it, so a
/// maintainer can find the bot's copy when resolving conflicts by hand.
pub fn pr_body(upstream: &RepoId, staging: &StagingRepo) -> String {
    let copy = format!("`{}/{}`", staging.owner, staging.name);
    let copy = match &staging.url {
        Some(url) => format!("[{}]({})", copy, url),
        None => copy,
    };
    format!(
        "Hello!\n\
         \n\
         The upstream repository `{upstream}` has new changes that are not in this fork yet. \
         They are in this pull request, ready to be merged.\n\
         \n\
         If the pull request merges cleanly, you are up to date once it lands. If it has \
         conflicts, the bot keeps a copy of upstream at {copy} that you can pull from to \
         resolve them locally.\n\
         \n\
         --------\n\
         Opened automatically by Backstroke. To stop receiving these, label any pull request \
         in this repository with the opt-out label.\n",
        upstream = upstream,
        copy = copy,
    )
}

/// Runs the per-target workflow.
///
/// `source` clients reach the upstream's provider (branch lookup and
/// staging copy); `target` clients reach the downstream's provider
/// (opt-out search and the pull request).
#[derive(Debug, Clone)]
pub struct Synchronizer {
    source: ForgeClients,
    target: ForgeClients,
    bot: BotIdentity,
    opt_out_label: String,
}

impl Synchronizer {
    pub fn new(
        source: ForgeClients,
        target: ForgeClients,
        bot: BotIdentity,
        opt_out_label: impl Into<String>,
    ) -> Self {
        Self {
            source,
            target,
            bot,
            opt_out_label: opt_out_label.into(),
        }
    }

    /// Synchronize `to` with `from`.
    ///
    /// # Errors
    ///
    /// - `SyncError::ProviderNotConfigured` if a bot client is missing
    /// - `SyncError::Provider` for any gateway failure other than a
    ///   duplicate pull request
    pub async fn sync(&self, from: &Endpoint, to: &Endpoint) -> Result<SyncOutcome, SyncError> {
        let target_bot = self.target.bot()?;

        if opt_out::check(self.target.user().as_ref(), &to.repo, &self.opt_out_label).await? {
            tracing::info!(target = %to.repo, "target opted out");
            return Ok(SyncOutcome::OptedOut);
        }

        let staging = staging::materialize(&self.source, &from.repo, &from.branch, &self.bot).await?;

        let request = CreatePrRequest {
            repo: to.repo.clone(),
            head: format!("{}:{}", staging.owner, from.branch),
            base: to.branch.to_string(),
            title: pr_title(&from.repo),
            body: pr_body(&from.repo, &staging),
        };

        match target_bot.create_pull_request(request).await {
            Ok(pr) => {
                tracing::info!(target = %to.repo, number = pr.number, url = %pr.url, "pull request created");
                Ok(SyncOutcome::PullRequestCreated {
                    number: pr.number,
                    url: pr.url,
                })
            }
            Err(e) if e.is_duplicate() => {
                tracing::info!(target = %to.repo, reason = %e, "pull request already exists");
                Ok(SyncOutcome::AlreadyExists)
            }
            Err(e) => Err(SyncError::Provider(e)),
        }
    }
}
