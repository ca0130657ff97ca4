//! Error types for the skip decision engine.
//!
//! Errors fall into two classes. Fatal errors (bad configuration, missing
//! run identity, a known failing duplicate) abort before a skip can be
//! emitted. Degradable errors (remote calls, ledger persistence) are caught
//! by the orchestrator and turn the affected step into "couldn't determine".

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::core::WorkflowRun;

/// The main error type for runskip operations.
#[derive(Debug, Error)]
pub enum SkipError {
    /// A configuration option was malformed.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The current run lacks an identity field needed for comparison.
    #[error("Current run {run_id} is missing its {field}; cannot compare runs safely")]
    MissingIdentity {
        /// The run being evaluated.
        run_id: u64,
        /// The missing field.
        field: IdentityField,
    },

    /// An older run with identical content already failed.
    #[error(
        "Run {} with identical content (tree {}) concluded with failure; \
         re-run this workflow manually to retry the same content",
        failed_run.id,
        failed_run.tree_hash
    )]
    KnownFailure {
        /// The failed run.
        failed_run: Box<WorkflowRun>,
    },

    /// A remote platform call failed.
    #[error("{0}")]
    Platform(#[from] PlatformError),

    /// The memo ledger could not be encoded, decoded or persisted.
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SkipError {
    /// Creates a missing identity error.
    #[must_use]
    pub fn missing_identity(run_id: u64, field: IdentityField) -> Self {
        Self::MissingIdentity { run_id, field }
    }

    /// Creates a known failure error citing the failed run.
    #[must_use]
    pub fn known_failure(failed_run: WorkflowRun) -> Self {
        Self::KnownFailure {
            failed_run: Box::new(failed_run),
        }
    }

    /// Creates a ledger error.
    #[must_use]
    pub fn ledger(message: impl Into<String>) -> Self {
        Self::Ledger(message.into())
    }

    /// Returns true if the error must abort evaluation instead of degrading.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::MissingIdentity { .. } | Self::KnownFailure { .. }
        )
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        let kind = match self {
            Self::Config(_) => "config",
            Self::MissingIdentity { .. } => "missing_identity",
            Self::KnownFailure { .. } => "known_failure",
            Self::Platform(_) => "platform",
            Self::Ledger(_) => "ledger",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        };
        map.insert("type".to_string(), serde_json::json!(kind));
        map.insert("fatal".to_string(), serde_json::json!(self.is_fatal()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        if let Self::KnownFailure { failed_run } = self {
            map.insert("failed_run_id".to_string(), serde_json::json!(failed_run.id));
        }
        map
    }
}

/// Identity fields the current run must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityField {
    /// Content fingerprint of the checked-out tree.
    TreeHash,
    /// Workflow (pipeline) id.
    WorkflowId,
    /// Repository identity.
    Repository,
}

impl std::fmt::Display for IdentityField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TreeHash => write!(f, "tree hash"),
            Self::WorkflowId => write!(f, "workflow id"),
            Self::Repository => write!(f, "repository"),
        }
    }
}

/// Error raised when a configuration option cannot be parsed.
#[derive(Debug, Clone, Error)]
#[error("Invalid option '{option}': {message}")]
pub struct ConfigError {
    /// The option name.
    pub option: String,
    /// What was wrong with it.
    pub message: String,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            option: option.into(),
            message: message.into(),
        }
    }
}

/// Error raised by a remote platform call.
#[derive(Debug, Clone, Error)]
#[error("Platform call '{operation}' failed: {message}")]
pub struct PlatformError {
    /// The operation that failed (e.g. "get_commit").
    pub operation: String,
    /// The failure message.
    pub message: String,
}

impl PlatformError {
    /// Creates a new platform error.
    #[must_use]
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RunConclusion, RunStatus};
    use chrono::Utc;

    fn failed_run() -> WorkflowRun {
        WorkflowRun {
            id: 7,
            run_number: 3,
            event: "push".to_string(),
            tree_hash: "tree-a".to_string(),
            commit_hash: "sha-a".to_string(),
            status: RunStatus::Completed,
            conclusion: Some(RunConclusion::Failure),
            html_url: "https://ci.example/runs/7".to_string(),
            branch: Some("main".to_string()),
            repository: "acme/widgets".to_string(),
            workflow_id: 11,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_config_error_message() {
        let err: SkipError = ConfigError::new("concurrent_skipping", "unknown value 'sometimes'").into();
        assert!(err.to_string().contains("concurrent_skipping"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_known_failure_is_fatal() {
        let err = SkipError::known_failure(failed_run());
        assert!(err.is_fatal());
        assert!(err.to_string().contains("tree-a"));

        let dict = err.to_dict();
        assert_eq!(dict.get("type").unwrap(), "known_failure");
        assert_eq!(dict.get("failed_run_id").unwrap(), 7);
    }

    #[test]
    fn test_platform_error_is_not_fatal() {
        let err: SkipError = PlatformError::new("get_commit", "502 Bad Gateway").into();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("get_commit"));
    }

    #[test]
    fn test_missing_identity_message() {
        let err = SkipError::missing_identity(42, IdentityField::TreeHash);
        assert!(err.is_fatal());
        assert!(err.to_string().contains("tree hash"));
    }
}
