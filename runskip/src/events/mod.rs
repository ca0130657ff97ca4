//! Audit events emitted while a decision is made.
//!
//! Every rule that concludes (or acts, like the canceller) emits one event
//! to the configured [`EventSink`], so a host can keep an audit trail of why
//! a run was or was not skipped.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Outdated runs were cancelled.
    #[serde(rename = "decision.cancel")]
    Cancel,
    /// The trigger event is exempt from skipping.
    #[serde(rename = "decision.do_not_skip")]
    DoNotSkip,
    /// A duplicate run decided.
    #[serde(rename = "decision.duplicate")]
    Duplicate,
    /// A concurrent run decided.
    #[serde(rename = "decision.concurrency")]
    Concurrency,
    /// The path search finished.
    #[serde(rename = "decision.paths")]
    Paths,
    /// The final decision.
    #[serde(rename = "decision.final")]
    Final,
    /// The ledger was loaded.
    #[serde(rename = "ledger.loaded")]
    LedgerLoaded,
    /// The ledger was written.
    #[serde(rename = "ledger.persisted")]
    LedgerPersisted,
}

impl EventKind {
    /// Returns the dotted event name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancel => "decision.cancel",
            Self::DoNotSkip => "decision.do_not_skip",
            Self::Duplicate => "decision.duplicate",
            Self::Concurrency => "decision.concurrency",
            Self::Paths => "decision.paths",
            Self::Final => "decision.final",
            Self::LedgerLoaded => "ledger.loaded",
            Self::LedgerPersisted => "ledger.persisted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
