//! Verdict policies evaluated before the path search.
//!
//! Each policy inspects the [`RunRegistry`](crate::registry::RunRegistry)
//! and returns a [`Step`](crate::core::Step): a conclusive verdict or
//! `Continue`. The canceller is the exception; it acts on sibling runs and
//! never produces a verdict.

mod cancel;
mod concurrency;
mod duplicates;

pub use cancel::{cancel_outdated, cancellation_candidates, CancelOutcome};
pub use concurrency::resolve_concurrency;
pub use duplicates::{check_do_not_skip, detect_duplicates};
