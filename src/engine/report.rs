//! engine::report
//!
//! Outcomes and the report returned to callers.
//!
//! Serialized field names are camelCase to match the JSON shape callers
//! already consume (`isEnabled`, `forkCount`, `pullRequest`).
//!
//! # Example
//!
//! ```
//! use backstroke::engine::{SyncOutcome, SyncReport};
//!
//! let report = SyncReport::single(SyncOutcome::AlreadyExists);
//! let json = serde_json::to_value(&report).unwrap();
//! assert_eq!(json["forkCount"], 1);
//! assert_eq!(json["pullRequest"]["kind"], "already-exists");
//! ```

use serde::Serialize;

use crate::core::types::RepoId;

/// Result of one synchronizer invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SyncOutcome {
    /// A new pull request was opened.
    PullRequestCreated { number: u64, url: String },

    /// The target declined automated pull requests.
    OptedOut,

    /// The provider already has this pull request open.
    AlreadyExists,

    /// A provider call failed. Only produced for fan-out targets; a
    /// single-target run fails instead.
    ProviderError { detail: String },
}

impl SyncOutcome {
    /// Whether this outcome represents a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::ProviderError { .. })
    }

    /// Short human label.
    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::PullRequestCreated { .. } => "pull request created",
            SyncOutcome::OptedOut => "opted out",
            SyncOutcome::AlreadyExists => "already exists",
            SyncOutcome::ProviderError { .. } => "provider error",
        }
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncOutcome::PullRequestCreated { number, url } => {
                write!(f, "pull request #{} created ({})", number, url)
            }
            SyncOutcome::ProviderError { detail } => write!(f, "provider error: {}", detail),
            other => f.write_str(other.label()),
        }
    }
}

/// Outcome for one fork of a fan-out run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForkOutcome {
    pub fork: RepoId,
    pub outcome: SyncOutcome,
}

/// Whether the run executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Ok,
    /// The link was not actionable; nothing was called.
    Skipped,
}

/// Why a run was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    #[serde(rename = "not-enabled")]
    NotEnabled,
    #[serde(rename = "to-or-from-false")]
    MissingEndpoints,
}

/// Counts of fan-out outcomes by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub created: usize,
    pub opted_out: usize,
    pub already_exists: usize,
    pub failed: usize,
}

/// Report of one dispatcher run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub status: ReportStatus,
    pub is_enabled: bool,
    pub many: bool,
    pub fork_count: u64,

    /// Outcome of a single-target run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<SyncOutcome>,

    /// Per-fork outcomes of a fan-out run.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forks: Vec<ForkOutcome>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SkipReason>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl SyncReport {
    /// Report for a disabled link.
    pub fn not_enabled() -> Self {
        Self {
            status: ReportStatus::Skipped,
            is_enabled: false,
            many: false,
            fork_count: 0,
            pull_request: None,
            forks: Vec::new(),
            error: Some(SkipReason::NotEnabled),
            msg: Some("This link is disabled.".to_string()),
        }
    }

    /// Report for a link missing `from`, `to`, or both.
    pub fn missing_endpoints(missing: &[&str]) -> Self {
        Self {
            status: ReportStatus::Skipped,
            is_enabled: true,
            many: false,
            fork_count: 0,
            pull_request: None,
            forks: Vec::new(),
            error: Some(SkipReason::MissingEndpoints),
            msg: Some(format!(
                "Please set both a \"to\" and \"from\" on this link (missing: {}).",
                missing.join(", ")
            )),
        }
    }

    /// Report for a single-target run.
    pub fn single(outcome: SyncOutcome) -> Self {
        Self {
            status: ReportStatus::Ok,
            is_enabled: true,
            many: false,
            fork_count: 1,
            pull_request: Some(outcome),
            forks: Vec::new(),
            error: None,
            msg: None,
        }
    }

    /// Report for a fan-out run.
    pub fn fan_out(fork_count: u64, forks: Vec<ForkOutcome>) -> Self {
        Self {
            status: ReportStatus::Ok,
            is_enabled: true,
            many: true,
            fork_count,
            pull_request: None,
            forks,
            error: None,
            msg: None,
        }
    }

    /// Count outcomes by kind across the whole report.
    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        let outcomes = self
            .pull_request
            .iter()
            .chain(self.forks.iter().map(|f| &f.outcome));
        for outcome in outcomes {
            match outcome {
                SyncOutcome::PullRequestCreated { .. } => tally.created += 1,
                SyncOutcome::OptedOut => tally.opted_out += 1,
                SyncOutcome::AlreadyExists => tally.already_exists += 1,
                SyncOutcome::ProviderError { .. } => tally.failed += 1,
            }
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod outcome {
        use super::*;

        #[test]
        fn serializes_with_kind_tag() {
            let created = SyncOutcome::PullRequestCreated {
                number: 7,
                url: "https://github.com/a/b/pull/7".into(),
            };
            assert_eq!(
                serde_json::to_value(&created).unwrap(),
                json!({"kind": "pull-request-created", "number": 7, "url": "https://github.com/a/b/pull/7"})
            );
            assert_eq!(
                serde_json::to_value(SyncOutcome::OptedOut).unwrap(),
                json!({"kind": "opted-out"})
            );
            assert_eq!(
                serde_json::to_value(SyncOutcome::ProviderError {
                    detail: "rate limited".into()
                })
                .unwrap(),
                json!({"kind": "provider-error", "detail": "rate limited"})
            );
        }

        #[test]
        fn display() {
            assert_eq!(SyncOutcome::AlreadyExists.to_string(), "already exists");
            assert_eq!(
                SyncOutcome::PullRequestCreated {
                    number: 3,
                    url: "u".into()
                }
                .to_string(),
                "pull request #3 created (u)"
            );
        }

        #[test]
        fn only_provider_error_is_failure() {
            assert!(SyncOutcome::ProviderError { detail: "x".into() }.is_failure());
            assert!(!SyncOutcome::OptedOut.is_failure());
            assert!(!SyncOutcome::AlreadyExists.is_failure());
        }
    }

    mod report {
        use super::*;

        #[test]
        fn not_enabled_shape() {
            let json = serde_json::to_value(SyncReport::not_enabled()).unwrap();
            assert_eq!(json["status"], "skipped");
            assert_eq!(json["isEnabled"], false);
            assert_eq!(json["error"], "not-enabled");
            assert!(json.get("pullRequest").is_none());
            assert!(json.get("forks").is_none());
        }

        #[test]
        fn missing_endpoints_names_fields() {
            let report = SyncReport::missing_endpoints(&["from", "to"]);
            let json = serde_json::to_value(&report).unwrap();
            assert_eq!(json["error"], "to-or-from-false");
            assert_eq!(json["isEnabled"], true);
            assert!(report.msg.unwrap().contains("missing: from, to"));
        }

        #[test]
        fn fan_out_shape() {
            let fork = RepoId::parse("alice/stream").unwrap();
            let report = SyncReport::fan_out(
                1,
                vec![ForkOutcome {
                    fork,
                    outcome: SyncOutcome::AlreadyExists,
                }],
            );
            let json = serde_json::to_value(&report).unwrap();
            assert_eq!(json["status"], "ok");
            assert_eq!(json["many"], true);
            assert_eq!(json["forkCount"], 1);
            assert_eq!(json["forks"][0]["fork"], "alice/stream");
            assert_eq!(json["forks"][0]["outcome"]["kind"], "already-exists");
            assert!(json.get("error").is_none());
        }

        #[test]
        fn tally_counts_every_outcome() {
            let fork = |n: &str| RepoId::parse(n).unwrap();
            let report = SyncReport::fan_out(
                4,
                vec![
                    ForkOutcome {
                        fork: fork("a/x"),
                        outcome: SyncOutcome::OptedOut,
                    },
                    ForkOutcome {
                        fork: fork("b/x"),
                        outcome: SyncOutcome::AlreadyExists,
                    },
                    ForkOutcome {
                        fork: fork("c/x"),
                        outcome: SyncOutcome::ProviderError { detail: "x".into() },
                    },
                    ForkOutcome {
                        fork: fork("d/x"),
                        outcome: SyncOutcome::PullRequestCreated {
                            number: 1,
                            url: "u".into(),
                        },
                    },
                ],
            );
            assert_eq!(
                report.tally(),
                Tally {
                    created: 1,
                    opted_out: 1,
                    already_exists: 1,
                    failed: 1
                }
            );
        }
    }
}
