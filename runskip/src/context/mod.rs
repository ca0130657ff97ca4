//! Invocation context.
//!
//! Trigger event, run id and commit sha are carried explicitly in a
//! [`RunContext`] rather than read from the environment by low-level code.

mod identity;

pub use identity::{is_pull_request_event, RunContext};
