//! Testing utilities for runskip.
//!
//! This module provides:
//! - In-memory implementations of the platform ports
//! - Builders for raw run and commit records

mod fakes;
mod fixtures;

pub use fakes::{InMemoryArtifactStore, InMemoryPlatform};
pub use fixtures::{commit, fixture_time, linear_history, RunBuilder};
