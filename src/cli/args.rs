//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Only warnings and errors on stderr
//! - `--json`: Machine-readable output on stdout

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Backstroke - keep forks up to date with their upstream through pull requests
#[derive(Parser, Debug)]
#[command(name = "backstroke")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true, conflicts_with = "debug")]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Synchronize a link: open pull requests carrying upstream's changes
    #[command(
        name = "run",
        long_about = "Synchronize a link.\n\n\
            Reads a link definition (JSON) and opens a pull request from the upstream \
            into the target repository, or into every fork of the upstream when the \
            target type is 'fork-all'. Repositories that opted out are skipped, and \
            pull requests that already exist are left alone.",
        after_help = "\
LINK FORMAT:
    {
      \"enabled\": true,
      \"from\": {\"type\": \"repo\", \"provider\": \"github\", \"name\": \"owner/repo\", \"branch\": \"main\"},
      \"to\":   {\"type\": \"fork-all\", \"provider\": \"github\"}
    }

WORKFLOW EXAMPLES:
    # Synchronize one link
    backstroke run --link link.json

    # Machine-readable report
    backstroke run --link link.json --json

    # Read the link from stdin
    cat link.json | backstroke run --link -"
    )]
    Run {
        /// Path to the link JSON file ('-' for stdin)
        #[arg(long, value_name = "FILE")]
        link: PathBuf,

        /// Forks requested per page (1-100)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
        page_size: Option<u32>,

        /// Concurrent fork synchronizations per page
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        concurrency: Option<u64>,
    },

    /// Check whether a repository opted out of automated pull requests
    #[command(name = "opt-out")]
    OptOut {
        /// Repository as OWNER/REPO
        #[arg(value_name = "OWNER/REPO")]
        repo: String,

        /// Hosting provider
        #[arg(long, default_value = "github")]
        provider: String,
    },

    /// Show the effective configuration
    #[command(name = "config")]
    Config,

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash
    backstroke completion bash > ~/.local/share/bash-completion/completions/backstroke

    # Zsh
    backstroke completion zsh > ~/.zfunc/_backstroke"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run() {
        let cli = Cli::try_parse_from([
            "backstroke",
            "run",
            "--link",
            "link.json",
            "--page-size",
            "50",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Run {
                link,
                page_size,
                concurrency,
            } => {
                assert_eq!(link, PathBuf::from("link.json"));
                assert_eq!(page_size, Some(50));
                assert_eq!(concurrency, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn page_size_bounded() {
        assert!(Cli::try_parse_from(["backstroke", "run", "--link", "x", "--page-size", "0"]).is_err());
        assert!(
            Cli::try_parse_from(["backstroke", "run", "--link", "x", "--page-size", "101"])
                .is_err()
        );
    }

    #[test]
    fn opt_out_default_provider() {
        let cli = Cli::try_parse_from(["backstroke", "opt-out", "alice/stream"]).unwrap();
        match cli.command {
            Command::OptOut { repo, provider } => {
                assert_eq!(repo, "alice/stream");
                assert_eq!(provider, "github");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn log_filter_follows_flags() {
        let debug = Cli::try_parse_from(["backstroke", "--debug", "config"]).unwrap();
        assert_eq!(debug.log_filter(), "debug");
        let quiet = Cli::try_parse_from(["backstroke", "-q", "config"]).unwrap();
        assert_eq!(quiet.log_filter(), "warn");
        let default = Cli::try_parse_from(["backstroke", "config"]).unwrap();
        assert_eq!(default.log_filter(), "info");
    }
}
