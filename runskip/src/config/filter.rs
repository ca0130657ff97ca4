//! Named path filter configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::ConfigError;

/// Name of the filter derived from the plain `paths`/`paths_ignore` options.
pub const GLOBAL_FILTER: &str = "global";

/// How far back a filter may walk commit ancestry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawLimit", into = "RawLimit")]
pub enum BacktrackLimit {
    /// Walk until resolved (subject to the global step ceiling).
    Unlimited,
    /// Only the current commit is considered.
    Disabled,
    /// Walk at most this many commits.
    Commits(u32),
}

impl Default for BacktrackLimit {
    fn default() -> Self {
        Self::Unlimited
    }
}

impl BacktrackLimit {
    /// Returns true if the limit is reached at `distance` commits from HEAD.
    #[must_use]
    pub fn reached_at(&self, distance: usize) -> bool {
        match self {
            Self::Unlimited => false,
            Self::Disabled => distance >= 1,
            Self::Commits(n) => distance >= *n as usize,
        }
    }
}

/// Wire shape of a backtracking limit: `true`, `false` or a commit count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum RawLimit {
    Flag(bool),
    Count(u32),
}

impl From<RawLimit> for BacktrackLimit {
    fn from(raw: RawLimit) -> Self {
        match raw {
            RawLimit::Flag(true) => Self::Unlimited,
            RawLimit::Flag(false) => Self::Disabled,
            RawLimit::Count(n) => Self::Commits(n),
        }
    }
}

impl From<BacktrackLimit> for RawLimit {
    fn from(limit: BacktrackLimit) -> Self {
        match limit {
            BacktrackLimit::Unlimited => Self::Flag(true),
            BacktrackLimit::Disabled => Self::Flag(false),
            BacktrackLimit::Commits(n) => Self::Count(n),
        }
    }
}

/// Allow/deny globs for one named filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathFilterConfig {
    /// Allow-list: a commit is relevant only if it touches one of these.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Deny-list: a commit touching only these is ignorable.
    #[serde(default)]
    pub paths_ignore: Vec<String>,
    /// Ancestry walk limit.
    #[serde(default)]
    pub backtracking: BacktrackLimit,
}

impl PathFilterConfig {
    /// Creates an empty filter with unlimited backtracking.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the allow-list.
    #[must_use]
    pub fn with_paths<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths = globs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the deny-list.
    #[must_use]
    pub fn with_paths_ignore<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths_ignore = globs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the backtracking limit.
    #[must_use]
    pub fn with_backtracking(mut self, limit: BacktrackLimit) -> Self {
        self.backtracking = limit;
        self
    }
}

/// Parses the YAML `paths_filter` option.
pub(crate) fn parse_paths_filter(
    raw: &str,
) -> Result<BTreeMap<String, PathFilterConfig>, ConfigError> {
    let filters: BTreeMap<String, PathFilterConfig> = serde_yaml::from_str(raw)
        .map_err(|e| ConfigError::new("paths_filter", format!("invalid YAML filter mapping: {e}")))?;

    for (name, filter) in &filters {
        if name.trim().is_empty() {
            return Err(ConfigError::new("paths_filter", "filter names must not be empty"));
        }
        if filter.paths.is_empty() && filter.paths_ignore.is_empty() {
            return Err(ConfigError::new(
                "paths_filter",
                format!("filter '{name}' needs at least one of 'paths' or 'paths_ignore'"),
            ));
        }
    }
    Ok(filters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_reached() {
        assert!(!BacktrackLimit::Unlimited.reached_at(49));
        assert!(!BacktrackLimit::Disabled.reached_at(0));
        assert!(BacktrackLimit::Disabled.reached_at(1));
        assert!(!BacktrackLimit::Commits(3).reached_at(2));
        assert!(BacktrackLimit::Commits(3).reached_at(3));
    }

    #[test]
    fn test_limit_wire_format() {
        let limits: Vec<BacktrackLimit> = serde_json::from_str("[true, false, 7]").unwrap();
        assert_eq!(
            limits,
            vec![
                BacktrackLimit::Unlimited,
                BacktrackLimit::Disabled,
                BacktrackLimit::Commits(7)
            ]
        );
        assert_eq!(serde_json::to_string(&BacktrackLimit::Commits(2)).unwrap(), "2");
        assert_eq!(serde_json::to_string(&BacktrackLimit::Disabled).unwrap(), "false");
    }

    #[test]
    fn test_parse_paths_filter() {
        let yaml = "\
backend:
  paths: ['server/**']
  paths_ignore: ['server/**/*.md']
docs:
  paths: ['docs/**']
  backtracking: false
";
        let filters = parse_paths_filter(yaml).unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters["backend"].backtracking, BacktrackLimit::Unlimited);
        assert_eq!(filters["docs"].backtracking, BacktrackLimit::Disabled);
        assert_eq!(filters["backend"].paths_ignore, vec!["server/**/*.md"]);
    }

    #[test]
    fn test_parse_paths_filter_rejects_unknown_keys() {
        let err = parse_paths_filter("web:\n  path: ['web/**']\n").unwrap_err();
        assert_eq!(err.option, "paths_filter");
    }

    #[test]
    fn test_parse_paths_filter_rejects_empty_filter() {
        let err = parse_paths_filter("web:\n  backtracking: 2\n").unwrap_err();
        assert!(err.message.contains("web"));
    }
}
