//! Decision report and its encodings.
//!
//! A [`DecisionReport`] is what the invoking pipeline consumes. It renders
//! to a flat map of string outputs (the action output keys) and to a
//! markdown summary.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::backtrack::{BacktrackResult, FilterState};
use crate::core::{FilterVerdict, SkipReason, Verdict, WorkflowRun};
use crate::errors::SkipError;

/// Result of one filter, as reported in `paths_result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    /// `true`, `false` or `"unknown"`.
    pub should_skip: FilterVerdict,
    /// Commits walked before the verdict.
    pub backtrack_count: usize,
    /// Run whose tree justified a skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_by: Option<WorkflowRun>,
    /// Allow-listed files that forced a run.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched_files: Vec<String>,
}

impl From<&FilterState> for FilterReport {
    fn from(state: &FilterState) -> Self {
        Self {
            should_skip: state.verdict,
            backtrack_count: state.distance,
            skipped_by: state.cause.clone(),
            matched_files: state.matched_files.clone(),
        }
    }
}

/// The final decision for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionReport {
    /// Whether the run should be skipped.
    pub should_skip: bool,
    /// The rule that decided.
    pub reason: SkipReason,
    /// The run that justified a skip.
    pub skipped_by: Option<WorkflowRun>,
    /// Per-filter results, present once the path search ran.
    pub paths_result: BTreeMap<String, FilterReport>,
    /// Changed files per visited commit, present once the path search ran.
    /// An inner `None` (JSON `null`) marks a commit whose file list was
    /// unavailable and counted as changing everything.
    pub changed_files: Option<Vec<Option<Vec<String>>>>,
    /// Runs cancelled by this invocation.
    pub cancelled_runs: Vec<u64>,
    /// Ordered explanation of the rules evaluated.
    pub trace: Vec<String>,
}

impl DecisionReport {
    /// Creates a report from a verdict.
    #[must_use]
    pub fn new(verdict: Verdict) -> Self {
        Self {
            should_skip: verdict.should_skip,
            reason: verdict.reason,
            skipped_by: verdict.cause,
            paths_result: BTreeMap::new(),
            changed_files: None,
            cancelled_runs: Vec::new(),
            trace: Vec::new(),
        }
    }

    /// Attaches the path search result.
    #[must_use]
    pub fn with_paths(mut self, result: &BacktrackResult) -> Self {
        self.paths_result = result
            .iter()
            .map(|(name, state)| (name.to_string(), FilterReport::from(state)))
            .collect();
        self.changed_files = Some(result.changed_files.clone());
        self
    }

    /// Sets the cancelled runs.
    #[must_use]
    pub fn with_cancelled(mut self, runs: Vec<u64>) -> Self {
        self.cancelled_runs = runs;
        self
    }

    /// Sets the trace lines.
    #[must_use]
    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.trace = trace;
        self
    }

    /// Encodes the report as action outputs.
    ///
    /// Keys: `should_skip`, `reason`, `skipped_by`, `paths_result`,
    /// `changed_files`. Absent values are empty strings; structured values
    /// are JSON.
    pub fn to_outputs(&self) -> Result<BTreeMap<String, String>, SkipError> {
        let mut outputs = BTreeMap::new();
        outputs.insert("should_skip".to_string(), self.should_skip.to_string());
        outputs.insert("reason".to_string(), self.reason.to_string());
        outputs.insert(
            "skipped_by".to_string(),
            match &self.skipped_by {
                Some(run) => serde_json::to_string(run)?,
                None => String::new(),
            },
        );
        outputs.insert(
            "paths_result".to_string(),
            serde_json::to_string(&self.paths_result)?,
        );
        outputs.insert(
            "changed_files".to_string(),
            match &self.changed_files {
                Some(files) => serde_json::to_string(files)?,
                None => String::new(),
            },
        );
        Ok(outputs)
    }

    /// Renders a markdown summary for the run page.
    #[must_use]
    pub fn summary_markdown(&self) -> String {
        let mut out = String::new();
        let headline = if self.should_skip { "Skipping" } else { "Running" };
        let _ = writeln!(out, "### {headline} (`{}`)\n", self.reason);

        if let Some(run) = &self.skipped_by {
            let _ = writeln!(out, "Skipped in favour of {}.\n", link(run));
        }
        if !self.cancelled_runs.is_empty() {
            let ids: Vec<String> = self.cancelled_runs.iter().map(u64::to_string).collect();
            let _ = writeln!(out, "Cancelled outdated runs: {}.\n", ids.join(", "));
        }

        if !self.paths_result.is_empty() {
            out.push_str("| Filter | Skip | Commits walked | Skipped by | Matched files |\n");
            out.push_str("|---|---|---|---|---|\n");
            for (name, report) in &self.paths_result {
                let cause = report.skipped_by.as_ref().map(link).unwrap_or_default();
                let _ = writeln!(
                    out,
                    "| {name} | {} | {} | {cause} | {} |",
                    report.should_skip,
                    report.backtrack_count,
                    report.matched_files.join("<br>")
                );
            }
            out.push('\n');
        }

        if !self.trace.is_empty() {
            out.push_str("<details><summary>Evaluation trace</summary>\n\n");
            for line in &self.trace {
                let _ = writeln!(out, "- {line}");
            }
            out.push_str("\n</details>\n");
        }
        out
    }
}

fn link(run: &WorkflowRun) -> String {
    if run.html_url.is_empty() {
        run.label()
    } else {
        format!("[{}]({})", run.label(), run.html_url)
    }
}
