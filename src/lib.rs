//! Backstroke - keep forks up to date with their upstream
//!
//! Backstroke watches a link between an upstream repository and either one
//! downstream repository or every fork of the upstream, and opens pull
//! requests that carry upstream's new commits downstream.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Link dispatch, fork fan-out, and the per-target workflow
//! - [`core`] - Domain types and configuration
//! - [`forge`] - Provider gateway (GitHub, plus an in-memory mock)
//! - [`ui`] - Output formatting
//!
//! # Guarantees
//!
//! 1. A link that is disabled or incomplete never reaches a provider
//! 2. Unsupported providers and target types fail before any provider call
//! 3. Rerunning a link never opens a second identical pull request
//! 4. One failing fork never affects its siblings

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod ui;
