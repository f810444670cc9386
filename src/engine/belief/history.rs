// ── Belief: History Recorder ───────────────────────────────────────────────
// Appends one entry per executed decision, keyed by lineage root.
// Entries are immutable once written.

use crate::atoms::belief_types::{timestamp_now, HistoryAction, HistoryEntry};
use crate::atoms::error::EngineResult;
use crate::atoms::traits::HistoryStore;
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

pub struct HistoryRecorder {
    store: Arc<dyn HistoryStore>,
}

impl HistoryRecorder {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    pub fn record(
        &self,
        space_id: &str,
        lineage_root: &str,
        action: HistoryAction,
        old_fact_id: Option<&str>,
        new_fact_id: Option<&str>,
        reason: &str,
    ) -> EngineResult<HistoryEntry> {
        let entry = self.store.append_history(&HistoryEntry {
            seq: 0,
            memory_space_id: space_id.to_string(),
            lineage_root: lineage_root.to_string(),
            action,
            old_fact_id: old_fact_id.map(str::to_string),
            new_fact_id: new_fact_id.map(str::to_string),
            reason: reason.to_string(),
            timestamp: timestamp_now(),
        })?;
        debug!(
            "[belief:history] #{} {} root={} old={:?} new={:?}",
            entry.seq, entry.action, entry.lineage_root, entry.old_fact_id, entry.new_fact_id
        );
        Ok(entry)
    }

    /// Entries for a lineage, oldest first. Empty for unknown roots and for
    /// roots owned by another space.
    pub fn get_history(&self, space_id: &str, lineage_root: &str) -> EngineResult<Vec<HistoryEntry>> {
        self.store.history_for_lineage(space_id, lineage_root)
    }

    /// Facts folded into a survivor by consolidation.
    pub fn merged_fact_ids(&self, space_id: &str) -> EngineResult<HashSet<String>> {
        Ok(self
            .store
            .history_for_space(space_id)?
            .into_iter()
            .filter(|e| e.action == HistoryAction::Merge)
            .filter_map(|e| e.old_fact_id)
            .collect())
    }
}
