//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Command results go to stdout and respect the quiet flag. When `--json`
//! is enabled, output is machine-readable JSON. Errors always go to stderr.

use std::fmt::Display;

use serde::Serialize;

use crate::engine::{ReportStatus, SyncReport};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a value as pretty JSON.
pub fn json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Human-readable summary of a report.
///
/// # Example
///
/// ```
/// use backstroke::engine::{SyncOutcome, SyncReport};
/// use backstroke::ui::output::format_report;
///
/// let text = format_report(&SyncReport::single(SyncOutcome::OptedOut));
/// assert_eq!(text, "opted out");
/// ```
pub fn format_report(report: &SyncReport) -> String {
    if report.status == ReportStatus::Skipped {
        return format!(
            "skipped: {}",
            report.msg.as_deref().unwrap_or("link not actionable")
        );
    }

    if let Some(outcome) = &report.pull_request {
        return outcome.to_string();
    }

    let tally = report.tally();
    let mut lines = vec![format!(
        "{} forks: {} created, {} already open, {} opted out, {} failed",
        report.fork_count, tally.created, tally.already_exists, tally.opted_out, tally.failed
    )];
    lines.extend(
        report
            .forks
            .iter()
            .filter(|f| f.outcome.is_failure())
            .map(|f| format!("  {}: {}", f.fork, f.outcome)),
    );
    lines.join("\n")
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}
