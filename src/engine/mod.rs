//! engine
//!
//! The synchronization engine.
//!
//! # Architecture
//!
//! ```text
//! Dispatcher ─┬─ repo ─────► Synchronizer
//!             └─ fork-all ─► ForkEnumerator ─► Synchronizer (per fork)
//!
//! Synchronizer: opt-out check ─► staging copy ─► pull request
//! ```
//!
//! Every provider call goes through the [`crate::forge`] gateway.
//!
//! # Modules
//!
//! - [`dispatch`]: link validation and routing
//! - [`forks`]: paged, concurrent fan-out over forks
//! - [`pull_request`]: the per-target workflow
//! - [`staging`]: bot-owned staging copies
//! - [`opt_out`]: opt-out detection
//! - [`report`]: outcomes and reports
//! - [`error`]: error taxonomy
//!
//! # Example
//!
//! ```ignore
//! use backstroke::engine::{Dispatcher, SyncOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! let dispatcher = Dispatcher::new(forges, config.bot_identity(), SyncOptions::from_config(&config));
//! let report = dispatcher.run(&link, &CancellationToken::new()).await?;
//! println!("{} forks", report.fork_count);
//! ```

pub mod dispatch;
pub mod error;
pub mod forks;
pub mod opt_out;
pub mod pull_request;
pub mod report;
pub mod staging;

pub use dispatch::{Dispatcher, SyncOptions};
pub use error::SyncError;
pub use forks::{Enumeration, ForkCursor, ForkEnumerator};
pub use opt_out::has_opted_out;
pub use pull_request::{Endpoint, Synchronizer};
pub use report::{ForkOutcome, ReportStatus, SkipReason, SyncOutcome, SyncReport, Tally};
pub use staging::materialize;
