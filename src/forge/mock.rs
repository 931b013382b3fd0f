//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock keeps repositories, branches, forks, opt-outs, staging copies
//! and pull requests in memory. It reproduces the provider behaviors the
//! engine depends on:
//! - a second identical pull request is rejected as `Unprocessable`
//! - creating a staging copy twice returns the same copy
//! - fork listings are paged from zero and short pages end the listing
//!
//! Failures can be injected per operation, per fork page, or per
//! repository owner. An optional latency makes every call suspend, and the
//! mock records the highest number of calls it saw in flight at once.
//!
//! # Example
//!
//! ```
//! use backstroke::core::types::RepoId;
//! use backstroke::forge::mock::MockForge;
//! use backstroke::forge::Forge;
//!
//! # tokio_test::block_on(async {
//! let upstream = RepoId::parse("up/stream").unwrap();
//! let forge = MockForge::new()
//!     .with_branch(&upstream, "main", "abc123")
//!     .with_forks(&upstream, 3);
//!
//! assert_eq!(forge.get_branch_head(&upstream, "main").await.unwrap(), "abc123");
//! assert_eq!(forge.list_forks(&upstream, 0, 100).await.unwrap().len(), 3);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::traits::{
    CreatePrRequest, Forge, ForgeError, ForkSummary, PullRequest, StagingRepo,
};
use crate::core::types::{BotIdentity, RepoId};

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockForge {
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockForgeInner {
    /// Branch heads by (repository, branch).
    branches: HashMap<(RepoId, String), String>,
    /// Forks by parent repository, in listing order.
    forks: HashMap<RepoId, Vec<ForkSummary>>,
    /// Opt-out label by repository.
    opt_outs: HashMap<RepoId, String>,
    /// Open pull requests by target repository.
    prs: Vec<(RepoId, PullRequest)>,
    next_pr_number: u64,
    /// Staging copies by source repository.
    staging: HashMap<RepoId, StagingRepo>,
    /// Injected failures.
    failures: Vec<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
    latency: Option<Duration>,
    in_flight: usize,
    max_in_flight: usize,
    /// Token to cancel once a given fork page has been served.
    cancel_after_page: Option<(u32, CancellationToken)>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    SearchIssues(ForgeError),
    GetBranchHead(ForgeError),
    /// Fail every fork listing call.
    ListForks(ForgeError),
    /// Fail the listing of one zero-based page.
    ListForksPage { page: u32, error: ForgeError },
    CreatePullRequest(ForgeError),
    /// Fail pull request creation against repositories owned by `owner`.
    CreatePullRequestFor { owner: String, error: ForgeError },
    CreateStagingRepo(ForgeError),
    UpdateBranch(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    SearchIssues {
        query: String,
    },
    GetBranchHead {
        repo: RepoId,
        branch: String,
    },
    ListForks {
        repo: RepoId,
        page: u32,
        per_page: u32,
    },
    CreatePullRequest {
        repo: RepoId,
        head: String,
        base: String,
        title: String,
        body: String,
    },
    CreateStagingRepo {
        source: RepoId,
        owner: String,
    },
    UpdateBranch {
        repo: RepoId,
        branch: String,
        sha: String,
    },
}

impl MockOperation {
    /// Whether this operation changes provider state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            MockOperation::CreatePullRequest { .. }
                | MockOperation::CreateStagingRepo { .. }
                | MockOperation::UpdateBranch { .. }
        )
    }
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockForgeInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a branch pointing at `sha`.
    pub fn with_branch(self, repo: &RepoId, branch: &str, sha: &str) -> Self {
        self.state()
            .branches
            .insert((repo.clone(), branch.to_string()), sha.to_string());
        self
    }

    /// Add `count` public forks of `parent`, owned by `fork-0`, `fork-1`, ...
    pub fn with_forks(self, parent: &RepoId, count: usize) -> Self {
        let forks = (0..count)
            .filter_map(|i| RepoId::new(format!("fork-{i}"), parent.repo()).ok())
            .map(|id| ForkSummary { id, private: false })
            .collect();
        self.with_fork_list(parent, forks)
    }

    /// Set the forks of `parent` explicitly.
    pub fn with_fork_list(self, parent: &RepoId, forks: Vec<ForkSummary>) -> Self {
        self.state().forks.insert(parent.clone(), forks);
        self
    }

    /// Mark `repo` as opted out with a pull request carrying `label`.
    pub fn with_opt_out(self, repo: &RepoId, label: &str) -> Self {
        self.state().opt_outs.insert(repo.clone(), label.to_string());
        self
    }

    /// Configure the mock to fail. May be called repeatedly; the first
    /// matching failure wins.
    ///
    /// # Example
    ///
    /// ```
    /// use backstroke::forge::mock::{FailOn, MockForge};
    /// use backstroke::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::CreatePullRequest(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.state().failures.push(fail_on);
        self
    }

    /// Make every call suspend for `latency` before answering.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state().latency = Some(latency);
        self
    }

    /// Cancel `token` right after the zero-based fork `page` is served.
    pub fn cancel_after_page(self, page: u32, token: CancellationToken) -> Self {
        self.state().cancel_after_page = Some((page, token));
        self
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    /// Number of provider calls made so far.
    pub fn call_count(&self) -> usize {
        self.state().operations.len()
    }

    /// Fork listing pages requested so far, in order.
    pub fn pages_requested(&self) -> Vec<u32> {
        self.state()
            .operations
            .iter()
            .filter_map(|op| match op {
                MockOperation::ListForks { page, .. } => Some(*page),
                _ => None,
            })
            .collect()
    }

    /// All open pull requests.
    pub fn pull_requests(&self) -> Vec<PullRequest> {
        self.state().prs.iter().map(|(_, pr)| pr.clone()).collect()
    }

    /// Staging copies created so far.
    pub fn staging_repos(&self) -> Vec<StagingRepo> {
        self.state().staging.values().cloned().collect()
    }

    /// Current head of a branch, including staging branches.
    pub fn branch_head(&self, repo: &RepoId, branch: &str) -> Option<String> {
        self.state()
            .branches
            .get(&(repo.clone(), branch.to_string()))
            .cloned()
    }

    /// Highest number of calls observed in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.state().max_in_flight
    }

    fn record(&self, op: MockOperation) {
        self.state().operations.push(op);
    }

    /// Find the first configured failure matching `pred`.
    fn check_fail(&self, pred: impl Fn(&FailOn) -> Option<ForgeError>) -> Result<(), ForgeError> {
        match self.state().failures.iter().find_map(pred) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Mark a call in flight and apply the configured latency.
    async fn enter(&self) -> InFlight {
        let latency = {
            let mut state = self.state();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.latency
        };
        let guard = InFlight {
            inner: Arc::clone(&self.inner),
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        guard
    }
}

/// Decrements the in-flight count when a call finishes.
struct InFlight {
    inner: Arc<Mutex<MockForgeInner>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

/// Split a search query on whitespace outside double quotes.
fn query_terms(query: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut start = None;
    let mut quoted = false;
    for (i, c) in query.char_indices() {
        if c.is_whitespace() && !quoted {
            if let Some(s) = start.take() {
                terms.push(&query[s..i]);
            }
            continue;
        }
        if c == '"' {
            quoted = !quoted;
        }
        start.get_or_insert(i);
    }
    if let Some(s) = start {
        terms.push(&query[s..]);
    }
    terms
}

/// Extract the value of `key:` from a search query, without its quotes.
fn query_term<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query_terms(query).into_iter().find_map(|term| {
        let value = term.strip_prefix(key)?.strip_prefix(':')?;
        Some(
            value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value),
        )
    })
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn search_issues(&self, query: &str) -> Result<u64, ForgeError> {
        self.record(MockOperation::SearchIssues {
            query: query.to_string(),
        });
        let _call = self.enter().await;
        self.check_fail(|f| match f {
            FailOn::SearchIssues(e) => Some(e.clone()),
            _ => None,
        })?;

        let repo = query_term(query, "repo").and_then(|r| RepoId::parse(r).ok());
        let label = query_term(query, "label");
        let state = self.state();
        let matched = match (repo, label) {
            (Some(repo), Some(label)) => state.opt_outs.get(&repo).is_some_and(|l| l == label),
            _ => false,
        };
        Ok(u64::from(matched))
    }

    async fn get_branch_head(&self, repo: &RepoId, branch: &str) -> Result<String, ForgeError> {
        self.record(MockOperation::GetBranchHead {
            repo: repo.clone(),
            branch: branch.to_string(),
        });
        let _call = self.enter().await;
        self.check_fail(|f| match f {
            FailOn::GetBranchHead(e) => Some(e.clone()),
            _ => None,
        })?;

        self.branch_head(repo, branch)
            .ok_or_else(|| ForgeError::NotFound(format!("branch {} in {}", branch, repo)))
    }

    async fn list_forks(
        &self,
        repo: &RepoId,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ForkSummary>, ForgeError> {
        self.record(MockOperation::ListForks {
            repo: repo.clone(),
            page,
            per_page,
        });
        let _call = self.enter().await;
        self.check_fail(|f| match f {
            FailOn::ListForks(e) => Some(e.clone()),
            FailOn::ListForksPage { page: p, error } if *p == page => Some(error.clone()),
            _ => None,
        })?;

        let mut state = self.state();
        let forks = state.forks.get(repo).cloned().unwrap_or_default();
        let start = (page as usize).saturating_mul(per_page as usize);
        let listed = forks
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();

        if state
            .cancel_after_page
            .as_ref()
            .is_some_and(|(cancel_page, _)| *cancel_page == page)
        {
            if let Some((_, token)) = state.cancel_after_page.take() {
                token.cancel();
            }
        }

        Ok(listed)
    }

    async fn create_pull_request(
        &self,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError> {
        self.record(MockOperation::CreatePullRequest {
            repo: request.repo.clone(),
            head: request.head.clone(),
            base: request.base.clone(),
            title: request.title.clone(),
            body: request.body.clone(),
        });
        let _call = self.enter().await;
        self.check_fail(|f| match f {
            FailOn::CreatePullRequest(e) => Some(e.clone()),
            FailOn::CreatePullRequestFor { owner, error } if owner == request.repo.owner() => {
                Some(error.clone())
            }
            _ => None,
        })?;

        let mut state = self.state();
        let duplicate = state.prs.iter().any(|(repo, pr)| {
            *repo == request.repo && pr.head == request.head && pr.base == request.base
        });
        if duplicate {
            return Err(ForgeError::Unprocessable(format!(
                "A pull request already exists for {}.",
                request.head
            )));
        }

        state.next_pr_number += 1;
        let number = state.next_pr_number;
        let pr = PullRequest {
            number,
            url: format!("https://github.com/{}/pull/{}", request.repo, number),
            head: request.head,
            base: request.base,
            title: request.title,
        };
        state.prs.push((request.repo, pr.clone()));
        Ok(pr)
    }

    async fn create_staging_repo(
        &self,
        source: &RepoId,
        bot: &BotIdentity,
    ) -> Result<StagingRepo, ForgeError> {
        self.record(MockOperation::CreateStagingRepo {
            source: source.clone(),
            owner: bot.staging_owner().to_string(),
        });
        let _call = self.enter().await;
        self.check_fail(|f| match f {
            FailOn::CreateStagingRepo(e) => Some(e.clone()),
            _ => None,
        })?;

        let mut state = self.state();
        let staging = state
            .staging
            .entry(source.clone())
            .or_insert_with(|| StagingRepo {
                owner: bot.staging_owner().to_string(),
                name: source.repo().to_string(),
                url: Some(format!(
                    "https://github.com/{}/{}",
                    bot.staging_owner(),
                    source.repo()
                )),
            })
            .clone();
        Ok(staging)
    }

    async fn update_branch(
        &self,
        repo: &RepoId,
        branch: &str,
        sha: &str,
    ) -> Result<(), ForgeError> {
        self.record(MockOperation::UpdateBranch {
            repo: repo.clone(),
            branch: branch.to_string(),
            sha: sha.to_string(),
        });
        let _call = self.enter().await;
        self.check_fail(|f| match f {
            FailOn::UpdateBranch(e) => Some(e.clone()),
            _ => None,
        })?;

        let mut state = self.state();
        let is_staging = state
            .staging
            .values()
            .any(|s| s.owner == repo.owner() && s.name == repo.repo());
        if !is_staging {
            return Err(ForgeError::NotFound(format!("repository {}", repo)));
        }
        state
            .branches
            .insert((repo.clone(), branch.to_string()), sha.to_string());
        Ok(())
    }
}
