//! # Runskip
//!
//! Decides, for one run of a CI workflow, whether that run can be skipped.
//!
//! A run is skipped when:
//!
//! - **Duplicate**: an older run already succeeded on byte-identical content
//!   (same tree hash)
//! - **Concurrency**: a sibling run in flight is already handling the work,
//!   according to the configured [`ConcurrencyPolicy`](config::ConcurrencyPolicy)
//! - **Paths**: every commit since a known-good ancestor only touched paths
//!   the configured filters do not care about
//!
//! Outdated sibling runs can optionally be cancelled, and a small memo
//! ledger persisted through the platform's artifact store carries
//! information across invocations (pull-request merge trees, past
//! decisions).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use runskip::prelude::*;
//!
//! let config = SkipConfig::from_inputs(&inputs)?;
//! let ctx = RunContext::new("acme/widgets", run_id, "push", sha);
//!
//! let report = Decider::new(&config, &platform, &artifacts)
//!     .with_sink(&LoggingEventSink::default())
//!     .decide(&ctx)
//!     .await?;
//!
//! for (key, value) in report.to_outputs()? {
//!     println!("{key}={value}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod backtrack;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod observability;
pub mod orchestrator;
pub mod output;
pub mod platform;
pub mod policies;
pub mod registry;
pub mod testing;


/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{BacktrackLimit, ConcurrencyPolicy, PathFilterConfig, SkipConfig};
    pub use crate::context::RunContext;
    pub use crate::core::{FilterVerdict, SkipReason, Verdict, WorkflowRun};
    pub use crate::errors::{ConfigError, PlatformError, SkipError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::orchestrator::{decide, Decider};
    pub use crate::output::{DecisionReport, FilterReport};
    pub use crate::platform::{ArtifactStore, CiPlatform, FsArtifactStore, RawCommit, RawRun};
}
