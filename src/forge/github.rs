//! forge::github
//!
//! GitHub forge implementation using the REST API.
//!
//! # Design
//!
//! One `GitHubForge` wraps one set of credentials. The synchronizer holds
//! two: the link owner's (searches, branch lookups, fork listings) and the
//! bot's (staging copies, pull requests).
//!
//! # Timeouts and Retries
//!
//! Every request carries the configured timeout; a timeout surfaces as
//! `ForgeError::Timeout`. Transient failures (rate limits, network errors,
//! timeouts, 5xx) are retried up to `max_retries` times with exponential
//! backoff. Anything else is returned on the first failure.
//!
//! # Pagination
//!
//! The `Forge` trait pages from zero; GitHub pages from one. The
//! translation happens in [`GitHubForge::list_forks`] and nowhere else.
//!
//! # Paths
//!
//! Branch names go into URL paths one percent-encoded segment at a time,
//! so `feat#1` is requested as `branches/feat%231`, never `branches/feat`.
//!
//! # Fresh staging forks
//!
//! GitHub creates forks asynchronously: the fork request answers 202 while
//! the copy's git data is still being set up, and ref calls against it see
//! 404 or 409 for a while. `update_branch` waits that out for a bounded
//! number of attempts.
//!
//! # Example
//!
//! ```ignore
//! use backstroke::forge::github::{GitHubForge, GitHubOptions};
//!
//! let forge = GitHubForge::new("ghp_xxx", GitHubOptions::default())?;
//! let count = forge.search_issues("repo:octocat/hello is:pr label:optout").await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use super::traits::{
    CreatePrRequest, Forge, ForgeError, ForkSummary, PullRequest, StagingRepo,
};
use crate::core::types::{BotIdentity, RepoId};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "backstroke";

/// Connection options for [`GitHubForge`].
#[derive(Debug, Clone)]
pub struct GitHubOptions {
    /// API base URL (configurable for GitHub Enterprise)
    pub api_base: String,
    /// Timeout applied to every request
    pub timeout: Duration,
    /// Retries for transient errors
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one
    pub retry_delay: Duration,
    /// Extra attempts at moving a staging ref while a new fork is set up
    pub fork_ready_retries: u32,
    /// Wait before the first of those attempts; grows linearly
    pub fork_ready_delay: Duration,
}

impl Default for GitHubOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_delay: Duration::from_millis(250),
            fork_ready_retries: 5,
            fork_ready_delay: Duration::from_secs(2),
        }
    }
}

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Bearer token
    token: String,
    /// API base URL, without trailing slash
    api_base: String,
    /// `api_base` parsed, for building repository paths
    base_url: Url,
    max_retries: u32,
    retry_delay: Duration,
    fork_ready_retries: u32,
    fork_ready_delay: Duration,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("has_token", &!self.token.is_empty())
            .field("api_base", &self.api_base)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl GitHubForge {
    /// Create a new GitHub forge.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::AuthRequired` for an empty token and
    /// `ForgeError::NetworkError` if the API base is not a usable URL or
    /// the HTTP client cannot be built.
    pub fn new(token: impl Into<String>, options: GitHubOptions) -> Result<Self, ForgeError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ForgeError::AuthRequired);
        }

        let api_base = options.api_base.trim_end_matches('/').to_string();
        let base_url = Url::parse(&api_base)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ForgeError::NetworkError(format!("invalid API base '{}'", api_base)))?;

        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            token,
            api_base,
            base_url,
            max_retries: options.max_retries,
            retry_delay: options.retry_delay,
            fork_ready_retries: options.fork_ready_retries,
            fork_ready_delay: options.fork_ready_delay,
        })
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint from path segments.
    ///
    /// Every segment is percent-encoded on its own.
    fn repo_url<'a>(&self, repo: &RepoId, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejected bases that cannot carry a path
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["repos", repo.owner(), repo.repo()])
                .extend(segments);
        }
        url
    }

    /// Send a request, retrying transient failures.
    ///
    /// `build` is called once per attempt since a `RequestBuilder` is
    /// consumed by sending.
    async fn execute<T, F>(&self, what: &str, build: F) -> Result<T, ForgeError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            tracing::debug!(request = what, attempt, "github request");

            let result = match build().headers(self.headers()?).send().await {
                Ok(response) => Self::handle_response(response).await,
                Err(e) => Err(map_send_error(what, e)),
            };

            match result {
                Err(ref e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.retry_delay.saturating_mul(2u32.saturating_pow(attempt));
                    tracing::warn!(
                        request = what,
                        attempt = attempt + 1,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "transient GitHub error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Err(Self::error_from_response(response, status).await)
        }
    }

    /// Map an error response to a `ForgeError`.
    async fn error_from_response(response: Response, status: StatusCode) -> ForgeError {
        // GitHub signals an exhausted primary rate limit with a 403.
        let rate_limit_exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "0");

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.describe(),
            Err(_) => "Unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if rate_limit_exhausted => ForgeError::RateLimited,
            StatusCode::FORBIDDEN => {
                ForgeError::AuthFailed(format!("Permission denied: {}", message))
            }
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::UNPROCESSABLE_ENTITY => ForgeError::Unprocessable(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

fn map_send_error(what: &str, e: reqwest::Error) -> ForgeError {
    if e.is_timeout() {
        ForgeError::Timeout(what.to_string())
    } else {
        ForgeError::NetworkError(e.to_string())
    }
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn search_issues(&self, query: &str) -> Result<u64, ForgeError> {
        let url = format!("{}/search/issues", self.api_base);
        let result: GitHubSearchResult = self
            .execute("search issues", || {
                self.client
                    .get(&url)
                    .query(&[("q", query), ("per_page", "1")])
            })
            .await?;
        Ok(result.total_count)
    }

    async fn get_branch_head(&self, repo: &RepoId, branch: &str) -> Result<String, ForgeError> {
        let url = self.repo_url(repo, branch_path(&["branches"], branch));
        let result: GitHubBranch = self
            .execute("get branch", || self.client.get(url.clone()))
            .await?;
        Ok(result.commit.sha)
    }

    async fn list_forks(
        &self,
        repo: &RepoId,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ForkSummary>, ForgeError> {
        let url = self.repo_url(repo, ["forks"]);
        // GitHub pages are one-based
        let query = [
            ("per_page", per_page.to_string()),
            ("page", (page + 1).to_string()),
        ];
        let forks: Vec<GitHubRepo> = self
            .execute("list forks", || self.client.get(url.clone()).query(&query))
            .await?;

        forks.into_iter().map(ForkSummary::try_from).collect()
    }

    async fn create_pull_request(
        &self,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError> {
        let url = self.repo_url(&request.repo, ["pulls"]);
        let body = CreatePrBody {
            head: &request.head,
            base: &request.base,
            title: &request.title,
            body: &request.body,
        };

        let pr: GitHubPullRequest = self
            .execute("create pull request", || {
                self.client.post(url.clone()).json(&body)
            })
            .await?;
        Ok(pr.into())
    }

    async fn create_staging_repo(
        &self,
        source: &RepoId,
        bot: &BotIdentity,
    ) -> Result<StagingRepo, ForgeError> {
        let url = self.repo_url(source, ["forks"]);
        let body = CreateForkBody {
            organization: bot.organization.as_deref(),
            default_branch_only: false,
        };

        // GitHub answers with the existing fork if the account already has one.
        let fork: GitHubRepo = self
            .execute("create staging fork", || {
                self.client.post(url.clone()).json(&body)
            })
            .await?;
        Ok(StagingRepo {
            owner: fork.owner.login,
            name: fork.name,
            url: fork.html_url,
        })
    }

    async fn update_branch(
        &self,
        repo: &RepoId,
        branch: &str,
        sha: &str,
    ) -> Result<(), ForgeError> {
        let mut attempt: u32 = 0;
        loop {
            match self.move_ref(repo, branch, sha).await {
                Err(e) if fork_pending(&e) && attempt < self.fork_ready_retries => {
                    attempt += 1;
                    let delay = self.fork_ready_delay.saturating_mul(attempt);
                    tracing::debug!(
                        %repo,
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "staging fork not ready, waiting"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

impl GitHubForge {
    /// Force-move `branch` to `sha`, creating the ref if it is missing.
    async fn move_ref(&self, repo: &RepoId, branch: &str, sha: &str) -> Result<(), ForgeError> {
        let url = self.repo_url(repo, branch_path(&["git", "refs", "heads"], branch));
        let body = UpdateRefBody { sha, force: true };

        let moved: Result<IgnoredAny, ForgeError> = self
            .execute("update staging ref", || {
                self.client.patch(url.clone()).json(&body)
            })
            .await;

        match moved {
            Ok(_) => Ok(()),
            // Missing refs come back as 422 "Reference does not exist"
            Err(ForgeError::Unprocessable(_)) | Err(ForgeError::NotFound(_)) => {
                let create_url = self.repo_url(repo, ["git", "refs"]);
                let ref_name = format!("refs/heads/{}", branch);
                let body = CreateRefBody {
                    ref_name: &ref_name,
                    sha,
                };
                let _: IgnoredAny = self
                    .execute("create staging ref", || {
                        self.client.post(create_url.clone()).json(&body)
                    })
                    .await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Path segments for `prefix` followed by the components of `branch`.
fn branch_path<'a>(prefix: &[&'a str], branch: &'a str) -> Vec<&'a str> {
    prefix.iter().copied().chain(branch.split('/')).collect()
}

/// Whether a ref call failed because a new fork is still being set up.
fn fork_pending(e: &ForgeError) -> bool {
    matches!(
        e,
        ForgeError::NotFound(_) | ForgeError::ApiError { status: 409, .. }
    )
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Request body for creating a PR.
#[derive(Serialize)]
struct CreatePrBody<'a> {
    head: &'a str,
    base: &'a str,
    title: &'a str,
    body: &'a str,
}

/// Request body for creating a fork.
#[derive(Serialize)]
struct CreateForkBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    organization: Option<&'a str>,
    default_branch_only: bool,
}

#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    ref_name: &'a str,
    sha: &'a str,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
    #[serde(default)]
    errors: Vec<GitHubErrorDetail>,
}

#[derive(Deserialize)]
struct GitHubErrorDetail {
    message: Option<String>,
}

impl GitHubErrorResponse {
    /// Top-level message plus any per-field details.
    fn describe(self) -> String {
        let details: Vec<String> = self.errors.into_iter().filter_map(|e| e.message).collect();
        if details.is_empty() {
            self.message
        } else {
            format!("{} ({})", self.message, details.join("; "))
        }
    }
}

#[derive(Deserialize)]
struct GitHubSearchResult {
    total_count: u64,
}

#[derive(Deserialize)]
struct GitHubBranch {
    commit: GitHubCommitRef,
}

#[derive(Deserialize)]
struct GitHubCommitRef {
    sha: String,
}

/// Minimal GitHub repository info.
#[derive(Deserialize)]
struct GitHubRepo {
    name: String,
    owner: GitHubOwnerInfo,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    html_url: Option<String>,
}

/// Minimal GitHub owner info.
#[derive(Deserialize)]
struct GitHubOwnerInfo {
    login: String,
}

impl TryFrom<GitHubRepo> for ForkSummary {
    type Error = ForgeError;

    fn try_from(gh: GitHubRepo) -> Result<Self, Self::Error> {
        let id = RepoId::new(gh.owner.login, gh.name).map_err(|e| ForgeError::ApiError {
            status: 200,
            message: format!("fork listing contained {}", e),
        })?;
        Ok(ForkSummary {
            id,
            private: gh.private,
        })
    }
}

/// GitHub PR response format.
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    html_url: String,
    head: GitHubRef,
    base: GitHubRef,
    title: String,
}

/// GitHub ref (head/base) format.
#[derive(Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    ref_name: String,
}

impl From<GitHubPullRequest> for PullRequest {
    fn from(pr: GitHubPullRequest) -> Self {
        PullRequest {
            number: pr.number,
            url: pr.html_url,
            head: pr.head.ref_name,
            base: pr.base.ref_name,
            title: pr.title,
        }
    }
}
