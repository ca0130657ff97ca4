//! Concurrency policy selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How in-flight sibling runs affect the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// Never skip because of concurrent runs.
    Never,
    /// Skip if any other run is in flight.
    Always,
    /// Skip if a newer run is in flight.
    OutdatedRuns,
    /// Skip if an in-flight run tests identical content.
    SameContent,
    /// Skip if an in-flight run with identical content has a lower run number.
    SameContentNewer,
}

impl Default for ConcurrencyPolicy {
    fn default() -> Self {
        Self::Never
    }
}

impl fmt::Display for ConcurrencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => write!(f, "never"),
            Self::Always => write!(f, "always"),
            Self::OutdatedRuns => write!(f, "outdated_runs"),
            Self::SameContent => write!(f, "same_content"),
            Self::SameContentNewer => write!(f, "same_content_newer"),
        }
    }
}

impl FromStr for ConcurrencyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(Self::Never),
            "always" => Ok(Self::Always),
            "outdated_runs" => Ok(Self::OutdatedRuns),
            "same_content" => Ok(Self::SameContent),
            "same_content_newer" => Ok(Self::SameContentNewer),
            other => Err(format!(
                "unknown value '{other}', expected one of: never, always, outdated_runs, same_content, same_content_newer"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrips_display() {
        for policy in [
            ConcurrencyPolicy::Never,
            ConcurrencyPolicy::Always,
            ConcurrencyPolicy::OutdatedRuns,
            ConcurrencyPolicy::SameContent,
            ConcurrencyPolicy::SameContentNewer,
        ] {
            assert_eq!(policy.to_string().parse::<ConcurrencyPolicy>(), Ok(policy));
        }
    }

    #[test]
    fn test_parse_unknown() {
        let err = "Always".parse::<ConcurrencyPolicy>().unwrap_err();
        assert!(err.contains("'Always'"));
    }
}
