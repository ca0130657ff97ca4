//! Configuration for the skip decision engine.
//!
//! [`SkipConfig`] can be built programmatically with the `with_*` builders
//! or parsed from the raw string options a CI action receives with
//! [`SkipConfig::from_inputs`]. Parsing is strict: any malformed value is a
//! [`ConfigError`] and no decision is attempted.

mod filter;
mod policy;

pub use filter::{BacktrackLimit, PathFilterConfig, GLOBAL_FILTER};
pub use policy::ConcurrencyPolicy;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::ConfigError;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipConfig {
    /// Global allow-list globs.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Global deny-list globs.
    #[serde(default)]
    pub paths_ignore: Vec<String>,
    /// Named path filters.
    #[serde(default)]
    pub paths_filter: BTreeMap<String, PathFilterConfig>,
    /// Trigger events that are never skipped.
    #[serde(default = "default_do_not_skip")]
    pub do_not_skip: BTreeSet<String>,
    /// Policy for in-flight sibling runs.
    #[serde(default)]
    pub concurrent_skipping: ConcurrencyPolicy,
    /// Whether to cancel outdated sibling runs.
    #[serde(default)]
    pub cancel_others: bool,
    /// Whether a successful duplicate allows skipping.
    #[serde(default = "default_true")]
    pub skip_after_successful_duplicate: bool,
    /// Maximum number of run entries kept in the memo ledger.
    #[serde(default = "default_ledger_retention")]
    pub ledger_retention: usize,
    /// Maximum number of ledger blobs kept in the artifact store.
    #[serde(default = "default_ledger_blob_retention")]
    pub ledger_blob_retention: usize,
}

fn default_do_not_skip() -> BTreeSet<String> {
    ["workflow_dispatch", "schedule", "merge_group"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_ledger_retention() -> usize {
    100
}

fn default_ledger_blob_retention() -> usize {
    4
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            paths_ignore: Vec::new(),
            paths_filter: BTreeMap::new(),
            do_not_skip: default_do_not_skip(),
            concurrent_skipping: ConcurrencyPolicy::default(),
            cancel_others: false,
            skip_after_successful_duplicate: default_true(),
            ledger_retention: default_ledger_retention(),
            ledger_blob_retention: default_ledger_blob_retention(),
        }
    }
}

impl SkipConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the global allow-list.
    #[must_use]
    pub fn with_paths<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths = globs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the global deny-list.
    #[must_use]
    pub fn with_paths_ignore<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths_ignore = globs.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a named path filter.
    #[must_use]
    pub fn with_filter(mut self, name: impl Into<String>, filter: PathFilterConfig) -> Self {
        self.paths_filter.insert(name.into(), filter);
        self
    }

    /// Replaces the set of exempt trigger events.
    #[must_use]
    pub fn with_do_not_skip<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.do_not_skip = events.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the concurrency policy.
    #[must_use]
    pub fn with_concurrent_skipping(mut self, policy: ConcurrencyPolicy) -> Self {
        self.concurrent_skipping = policy;
        self
    }

    /// Enables or disables cancelling outdated runs.
    #[must_use]
    pub fn with_cancel_others(mut self, enabled: bool) -> Self {
        self.cancel_others = enabled;
        self
    }

    /// Enables or disables skipping after a successful duplicate.
    #[must_use]
    pub fn with_skip_after_successful_duplicate(mut self, enabled: bool) -> Self {
        self.skip_after_successful_duplicate = enabled;
        self
    }

    /// Sets the ledger entry retention.
    #[must_use]
    pub fn with_ledger_retention(mut self, entries: usize) -> Self {
        self.ledger_retention = entries;
        self
    }

    /// Returns true if the global filter is derived from plain options.
    #[must_use]
    pub fn has_global_filter(&self) -> bool {
        !self.paths.is_empty() || !self.paths_ignore.is_empty()
    }

    /// Returns every filter to evaluate, the synthetic global one included.
    #[must_use]
    pub fn all_filters(&self) -> Vec<(String, PathFilterConfig)> {
        let mut filters: Vec<(String, PathFilterConfig)> = self
            .paths_filter
            .iter()
            .map(|(name, filter)| (name.clone(), filter.clone()))
            .collect();
        if self.has_global_filter() {
            filters.push((
                GLOBAL_FILTER.to_string(),
                PathFilterConfig::new()
                    .with_paths(self.paths.clone())
                    .with_paths_ignore(self.paths_ignore.clone()),
            ));
        }
        filters
    }

    /// Parses the raw option map of a CI action invocation.
    ///
    /// Recognized keys: `paths`, `paths_ignore` (JSON arrays), `paths_filter`
    /// (YAML mapping), `do_not_skip` (JSON array), `concurrent_skipping`,
    /// `cancel_others`, `skip_after_successful_duplicate`, `ledger_retention`,
    /// `ledger_blob_retention`. Missing or empty keys keep their defaults.
    pub fn from_inputs(inputs: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |key: &str| {
            inputs
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        if let Some(raw) = get("paths") {
            config.paths = parse_json_list("paths", raw)?;
        }
        if let Some(raw) = get("paths_ignore") {
            config.paths_ignore = parse_json_list("paths_ignore", raw)?;
        }
        if let Some(raw) = get("paths_filter") {
            config.paths_filter = filter::parse_paths_filter(raw)?;
        }
        if let Some(raw) = get("do_not_skip") {
            config.do_not_skip = parse_json_list("do_not_skip", raw)?.into_iter().collect();
        }
        if let Some(raw) = get("concurrent_skipping") {
            config.concurrent_skipping = raw
                .parse()
                .map_err(|message: String| ConfigError::new("concurrent_skipping", message))?;
        }
        if let Some(raw) = get("cancel_others") {
            config.cancel_others = parse_bool("cancel_others", raw)?;
        }
        if let Some(raw) = get("skip_after_successful_duplicate") {
            config.skip_after_successful_duplicate =
                parse_bool("skip_after_successful_duplicate", raw)?;
        }
        if let Some(raw) = get("ledger_retention") {
            config.ledger_retention = parse_count("ledger_retention", raw)?;
        }
        if let Some(raw) = get("ledger_blob_retention") {
            config.ledger_blob_retention = parse_count("ledger_blob_retention", raw)?;
        }

        config.validate()?;
        crate::backtrack::compile_filters(&config)?;
        Ok(config)
    }

    /// Checks invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paths_filter.contains_key(GLOBAL_FILTER) {
            return Err(ConfigError::new(
                "paths_filter",
                format!("filter name '{GLOBAL_FILTER}' is reserved for 'paths' and 'paths_ignore'"),
            ));
        }
        if self.ledger_blob_retention == 0 {
            return Err(ConfigError::new(
                "ledger_blob_retention",
                "must keep at least the latest ledger blob",
            ));
        }
        Ok(())
    }
}

fn parse_json_list(option: &str, raw: &str) -> Result<Vec<String>, ConfigError> {
    serde_json::from_str::<Vec<String>>(raw)
        .map_err(|e| ConfigError::new(option, format!("expected a JSON array of strings: {e}")))
}

fn parse_bool(option: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ConfigError::new(
            option,
            format!("expected 'true' or 'false', got '{other}'"),
        )),
    }
}

fn parse_count(option: &str, raw: &str) -> Result<usize, ConfigError> {
    raw.parse::<usize>()
        .map_err(|e| ConfigError::new(option, format!("expected a non-negative integer: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = SkipConfig::default();
        assert!(config.skip_after_successful_duplicate);
        assert!(!config.cancel_others);
        assert_eq!(config.concurrent_skipping, ConcurrencyPolicy::Never);
        assert!(config.do_not_skip.contains("workflow_dispatch"));
        assert!(config.do_not_skip.contains("schedule"));
        assert!(!config.has_global_filter());
        assert!(config.all_filters().is_empty());
    }

    #[test]
    fn test_from_inputs_full() {
        let config = SkipConfig::from_inputs(&inputs(&[
            ("paths", r#"["src/**"]"#),
            ("paths_ignore", r#"["**/*.md"]"#),
            ("do_not_skip", r#"["release"]"#),
            ("concurrent_skipping", "same_content_newer"),
            ("cancel_others", "true"),
            ("skip_after_successful_duplicate", "false"),
            ("ledger_retention", "25"),
            (
                "paths_filter",
                "frontend:\n  paths: ['web/**']\n  backtracking: 3\n",
            ),
        ]))
        .unwrap();

        assert_eq!(config.paths, vec!["src/**"]);
        assert_eq!(config.paths_ignore, vec!["**/*.md"]);
        assert_eq!(config.do_not_skip.len(), 1);
        assert_eq!(config.concurrent_skipping, ConcurrencyPolicy::SameContentNewer);
        assert!(config.cancel_others);
        assert!(!config.skip_after_successful_duplicate);
        assert_eq!(config.ledger_retention, 25);
        assert_eq!(
            config.paths_filter["frontend"].backtracking,
            BacktrackLimit::Commits(3)
        );

        let names: Vec<String> = config.all_filters().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["frontend".to_string(), GLOBAL_FILTER.to_string()]);
    }

    #[test]
    fn test_empty_inputs_keep_defaults() {
        let config = SkipConfig::from_inputs(&inputs(&[("paths", "  "), ("cancel_others", "")])).unwrap();
        assert_eq!(config, SkipConfig::default());
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let err = SkipConfig::from_inputs(&inputs(&[("concurrent_skipping", "sometimes")])).unwrap_err();
        assert_eq!(err.option, "concurrent_skipping");
    }

    #[test]
    fn test_malformed_list_is_rejected() {
        let err = SkipConfig::from_inputs(&inputs(&[("paths_ignore", "docs/**")])).unwrap_err();
        assert_eq!(err.option, "paths_ignore");

        let err = SkipConfig::from_inputs(&inputs(&[("cancel_others", "yes")])).unwrap_err();
        assert_eq!(err.option, "cancel_others");
    }

    #[test]
    fn test_reserved_global_name() {
        let err = SkipConfig::from_inputs(&inputs(&[
            ("paths", r#"["src/**"]"#),
            ("paths_filter", "global:\n  paths: ['x/**']\n"),
        ]))
        .unwrap_err();
        assert_eq!(err.option, "paths_filter");
    }

    #[test]
    fn test_reserved_global_name_without_plain_paths() {
        let err = SkipConfig::from_inputs(&inputs(&[(
            "paths_filter",
            "global:\n  paths_ignore: ['**/*.md']\n",
        )]))
        .unwrap_err();
        assert_eq!(err.option, "paths_filter");

        let built = SkipConfig::new()
            .with_filter("global", PathFilterConfig::new().with_paths_ignore(["**/*.md"]));
        assert!(built.validate().is_err());
    }

    #[test]
    fn test_zero_blob_retention_rejected() {
        let err = SkipConfig::from_inputs(&inputs(&[("ledger_blob_retention", "0")])).unwrap_err();
        assert_eq!(err.option, "ledger_blob_retention");
    }

    #[test]
    fn test_invalid_glob_is_rejected() {
        let err = SkipConfig::from_inputs(&inputs(&[("paths", r#"["src/[a"]"#)])).unwrap_err();
        assert_eq!(err.option, "global");
    }
}
