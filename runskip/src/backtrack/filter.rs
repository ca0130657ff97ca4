//! Compiled path filters.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::{BacktrackLimit, PathFilterConfig, SkipConfig};
use crate::errors::ConfigError;

/// A named filter with its globs compiled.
///
/// Globs use `/` as a literal separator (`*` stays within one directory,
/// `**` crosses directories) and match dotfiles like any other path.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    name: String,
    allow: Option<GlobSet>,
    deny: Option<GlobSet>,
    limit: BacktrackLimit,
}

impl CompiledFilter {
    /// Compiles a filter configuration.
    pub fn compile(name: impl Into<String>, config: &PathFilterConfig) -> Result<Self, ConfigError> {
        let name = name.into();
        Ok(Self {
            allow: build_set(&name, &config.paths)?,
            deny: build_set(&name, &config.paths_ignore)?,
            limit: config.backtracking,
            name,
        })
    }

    /// Returns the filter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backtracking limit.
    #[must_use]
    pub fn limit(&self) -> BacktrackLimit {
        self.limit
    }

    /// Returns true if every changed file matches the deny-list.
    ///
    /// Always false without a deny-list.
    #[must_use]
    pub fn all_ignored(&self, files: &[String]) -> bool {
        self.deny
            .as_ref()
            .is_some_and(|deny| files.iter().all(|f| deny.is_match(f)))
    }

    /// Returns the changed files matching the allow-list, or `None` when
    /// the filter has no allow-list.
    #[must_use]
    pub fn allowed_matches(&self, files: &[String]) -> Option<Vec<String>> {
        self.allow.as_ref().map(|allow| {
            files
                .iter()
                .filter(|f| allow.is_match(f.as_str()))
                .cloned()
                .collect()
        })
    }
}

fn build_set(filter: &str, globs: &[String]) -> Result<Option<GlobSet>, ConfigError> {
    if globs.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in globs {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| ConfigError::new(filter, format!("invalid glob '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| ConfigError::new(filter, e.to_string()))
}

/// Compiles every filter in `config`, the global one last.
pub fn compile_filters(config: &SkipConfig) -> Result<Vec<CompiledFilter>, ConfigError> {
    config
        .all_filters()
        .iter()
        .map(|(name, filter)| CompiledFilter::compile(name.clone(), filter))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| (*p).to_string()).collect()
    }

    #[test]
    fn test_deny_list() {
        let filter = CompiledFilter::compile(
            "docs",
            &PathFilterConfig::new().with_paths_ignore(["**/*.md", "docs/**"]),
        )
        .unwrap();

        assert!(filter.all_ignored(&files(&["README.md", "docs/a/b.txt"])));
        assert!(!filter.all_ignored(&files(&["README.md", "src/lib.rs"])));
        assert!(filter.allowed_matches(&files(&["src/lib.rs"])).is_none());
    }

    #[test]
    fn test_allow_list_and_separators() {
        let filter =
            CompiledFilter::compile("src", &PathFilterConfig::new().with_paths(["src/*.rs"])).unwrap();

        assert_eq!(
            filter.allowed_matches(&files(&["src/lib.rs", "src/nested/mod.rs", "README.md"])),
            Some(files(&["src/lib.rs"]))
        );
        assert!(!filter.all_ignored(&files(&["README.md"])));
    }

    #[test]
    fn test_dotfiles_match() {
        let filter =
            CompiledFilter::compile("ci", &PathFilterConfig::new().with_paths_ignore(["**/*.yml"])).unwrap();
        assert!(filter.all_ignored(&files(&[".github/workflows/ci.yml"])));
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let err = CompiledFilter::compile("bad", &PathFilterConfig::new().with_paths(["src/[a"]))
            .unwrap_err();
        assert!(err.to_string().contains("src/[a"));
    }

    #[test]
    fn test_compile_filters_puts_global_last() {
        let config = SkipConfig::new()
            .with_paths_ignore(["*.md"])
            .with_filter("backend", PathFilterConfig::new().with_paths(["api/**"]));
        let names: Vec<String> = compile_filters(&config)
            .unwrap()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(names, vec!["backend".to_string(), "global".to_string()]);
    }
}
