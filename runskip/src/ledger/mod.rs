//! Memo ledger: the one piece of state that survives between invocations.
//!
//! The platform cannot tell us, in a single query, which tree a
//! pull-request run actually tested (it reports the head branch tree, not
//! the merge result). Each invocation records what it resolved, plus its
//! own final decision, so later invocations can reuse it.
//!
//! The ledger is read once at the start of an invocation and written once
//! at the end, through [`LedgerStore`].

mod codec;
mod store;

pub use codec::{decode, encode, CodecMetrics, LEDGER_SCHEMA, LEDGER_VERSION};
pub use store::{ledger_prefix, LedgerStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{FilterVerdict, SkipReason};

/// Final decision of one invocation, kept for audit and future lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedDecision {
    /// Whether the run was skipped.
    pub should_skip: bool,
    /// The deciding rule; `None` when evaluation aborted.
    #[serde(default)]
    pub reason: Option<SkipReason>,
    /// Run that justified a skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped_by: Option<u64>,
    /// Per-filter verdicts.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, FilterVerdict>,
    /// Error message when evaluation aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything the ledger knows about one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Tree the run actually tested, when it differs from the reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_hash_override: Option<String>,
    /// The run's own final decision, once it finished evaluating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<RecordedDecision>,
    /// When the entry was last written.
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    fn empty() -> Self {
        Self {
            tree_hash_override: None,
            decision: None,
            updated_at: Utc::now(),
        }
    }

    /// Combines two copies of the same run's entry. Fields set in the more
    /// recently updated copy win; fields it lacks are kept from the other.
    fn absorb(&mut self, other: Self) {
        let (mut newer, older) = if other.updated_at >= self.updated_at {
            (other, std::mem::replace(self, Self::empty()))
        } else {
            (std::mem::replace(self, Self::empty()), other)
        };
        if newer.tree_hash_override.is_none() {
            newer.tree_hash_override = older.tree_hash_override;
        }
        if newer.decision.is_none() {
            newer.decision = older.decision;
        }
        *self = newer;
    }
}

/// In-memory view of the ledger, keyed by run id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoLedger {
    entries: BTreeMap<u64, LedgerEntry>,
    dirty: bool,
}

impl MemoLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: BTreeMap<u64, LedgerEntry>) -> Self {
        Self {
            entries,
            dirty: false,
        }
    }

    /// Returns the entries, ordered by run id.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<u64, LedgerEntry> {
        &self.entries
    }

    /// Returns the entry for a run.
    #[must_use]
    pub fn get(&self, run_id: u64) -> Option<&LedgerEntry> {
        self.entries.get(&run_id)
    }

    /// Returns the recorded tree override for a run.
    #[must_use]
    pub fn tree_override(&self, run_id: u64) -> Option<&str> {
        self.entries
            .get(&run_id)
            .and_then(|e| e.tree_hash_override.as_deref())
    }

    /// Records the resolved tree of a run.
    pub fn record_tree(&mut self, run_id: u64, tree_hash: impl Into<String>) {
        let tree_hash = tree_hash.into();
        let entry = self.entries.entry(run_id).or_insert_with(LedgerEntry::empty);
        if entry.tree_hash_override.as_deref() != Some(tree_hash.as_str()) {
            entry.tree_hash_override = Some(tree_hash);
            entry.updated_at = Utc::now();
            self.dirty = true;
        }
    }

    /// Records the final decision of a run.
    pub fn record_decision(&mut self, run_id: u64, decision: RecordedDecision) {
        let entry = self.entries.entry(run_id).or_insert_with(LedgerEntry::empty);
        entry.decision = Some(decision);
        entry.updated_at = Utc::now();
        self.dirty = true;
    }

    /// Folds in the entries of another copy of the ledger.
    ///
    /// Concurrent invocations each write their own blob, so the same run can
    /// appear in several of them. Per run, the most recently updated copy
    /// wins field by field. Merging does not mark the ledger dirty.
    pub fn merge(&mut self, other: MemoLedger) {
        for (run_id, entry) in other.entries {
            match self.entries.entry(run_id) {
                std::collections::btree_map::Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
                std::collections::btree_map::Entry::Occupied(mut slot) => slot.get_mut().absorb(entry),
            }
        }
    }

    /// Drops the oldest runs until at most `max_entries` remain.
    ///
    /// Run ids grow monotonically, so the lowest ids go first. Returns the
    /// number of entries removed.
    pub fn prune(&mut self, max_entries: usize) -> usize {
        let mut removed = 0;
        while self.entries.len() > max_entries {
            if self.entries.pop_first().is_none() {
                break;
            }
            removed += 1;
        }
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// Returns true if the ledger changed since it was loaded.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(skip: bool) -> RecordedDecision {
        RecordedDecision {
            should_skip: skip,
            reason: Some(SkipReason::NoTransferableRun),
            skipped_by: None,
            filters: BTreeMap::new(),
            error: None,
        }
    }

    fn entry(tree: Option<&str>, decision: Option<RecordedDecision>, second: i64) -> LedgerEntry {
        LedgerEntry {
            tree_hash_override: tree.map(String::from),
            decision,
            updated_at: DateTime::<Utc>::from_timestamp(1_700_000_000 + second, 0).unwrap(),
        }
    }

    #[test]
    fn test_merge_keeps_entries_from_both_copies() {
        let mut ours = MemoLedger::from_entries(BTreeMap::from([(1, entry(Some("m1"), None, 0))]));
        let theirs = MemoLedger::from_entries(BTreeMap::from([(2, entry(Some("m2"), None, 5))]));

        ours.merge(theirs);

        assert_eq!(ours.tree_override(1), Some("m1"));
        assert_eq!(ours.tree_override(2), Some("m2"));
        assert!(!ours.is_dirty());
    }

    #[test]
    fn test_merge_prefers_recent_fields() {
        let mut ours = MemoLedger::from_entries(BTreeMap::from([(
            1,
            entry(Some("stale"), Some(decision(false)), 0),
        )]));
        let theirs = MemoLedger::from_entries(BTreeMap::from([(1, entry(Some("fresh"), None, 9))]));

        ours.merge(theirs);

        let merged = ours.get(1).unwrap();
        assert_eq!(merged.tree_hash_override.as_deref(), Some("fresh"));
        assert_eq!(merged.decision, Some(decision(false)));

        let older = MemoLedger::from_entries(BTreeMap::from([(1, entry(Some("ancient"), None, -5))]));
        ours.merge(older);
        assert_eq!(ours.tree_override(1), Some("fresh"));
    }

    #[test]
    fn test_record_tree_and_decision() {
        let mut ledger = MemoLedger::new();
        assert!(!ledger.is_dirty());

        ledger.record_tree(10, "merge-tree");
        ledger.record_decision(10, decision(false));

        assert!(ledger.is_dirty());
        assert_eq!(ledger.tree_override(10), Some("merge-tree"));
        assert_eq!(ledger.get(10).unwrap().decision, Some(decision(false)));
        assert_eq!(ledger.tree_override(11), None);
    }

    #[test]
    fn test_recording_same_tree_is_not_a_change() {
        let mut entries = BTreeMap::new();
        entries.insert(
            3,
            LedgerEntry {
                tree_hash_override: Some("t".to_string()),
                decision: None,
                updated_at: Utc::now(),
            },
        );
        let mut ledger = MemoLedger::from_entries(entries);
        ledger.record_tree(3, "t");
        assert!(!ledger.is_dirty());
    }

    #[test]
    fn test_prune_keeps_newest_runs() {
        let mut ledger = MemoLedger::new();
        for id in [5, 1, 9, 3, 7] {
            ledger.record_tree(id, format!("tree-{id}"));
        }

        assert_eq!(ledger.prune(3), 2);
        let ids: Vec<u64> = ledger.entries().keys().copied().collect();
        assert_eq!(ids, vec![5, 7, 9]);
        assert_eq!(ledger.prune(10), 0);
    }
}
