//! core
//!
//! Core domain types and configuration for Backstroke.
//!
//! # Modules
//!
//! - [`types`] - Strong types: RepoId, RepoRef, Link, BranchName, BotIdentity
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Link input stays loosely typed until the dispatcher validates it
//! - Schemas are strict and self-describing

pub mod config;
pub mod types;
