// ── Belief: Consolidator ───────────────────────────────────────────────────
//
// Folds a group of near-duplicate facts into one survivor.
//
// Stages:
//   1. Resolve      – every id must exist in the space (no writes on failure)
//   2. Retire       – each loser gets superseded_by = keep, valid_until = now,
//                     one guarded write per loser
//   3. Aggregate    – keep.confidence = max over keep + merged losers
//   4. Record       – one MERGE history entry per merged loser
//
// Failures in stages 2-4 are collected into the report, never returned.
//
// Losers point straight at the survivor; there is no chaining between them
// and the survivor's version, text and links are untouched.

use crate::atoms::belief_types::{
    timestamp_now, ConsolidationFailure, ConsolidationReport, ConsolidationStage, Fact,
    HistoryAction,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::FactStore;
use crate::engine::belief::history::HistoryRecorder;
use crate::engine::belief::version_chain::VersionChainExecutor;
use log::{info, warn};
use std::collections::HashSet;
use std::sync::Arc;

const DEFAULT_MERGE_REASON: &str = "Consolidated duplicate fact";

pub struct Consolidator {
    store: Arc<dyn FactStore>,
    chain: Arc<VersionChainExecutor>,
    history: Arc<HistoryRecorder>,
}

impl Consolidator {
    pub fn new(
        store: Arc<dyn FactStore>,
        chain: Arc<VersionChainExecutor>,
        history: Arc<HistoryRecorder>,
    ) -> Self {
        Self { store, chain, history }
    }

    /// Merge `fact_ids` into `keep_id`. `keep_id` may be omitted from the list.
    pub fn consolidate(
        &self,
        space_id: &str,
        fact_ids: &[String],
        keep_id: &str,
        reason: Option<&str>,
    ) -> EngineResult<ConsolidationReport> {
        let reason = reason.unwrap_or(DEFAULT_MERGE_REASON);

        // ── 1. Resolve ─────────────────────────────────────────────────
        let keep = self.chain.ensure_in_space(space_id, keep_id)?;
        if !keep.is_active() {
            return Err(EngineError::validation(format!(
                "survivor {} is superseded and cannot absorb other facts",
                keep_id
            )));
        }

        let mut seen = HashSet::from([keep_id.to_string()]);
        let mut losers: Vec<(Fact, Fact)> = Vec::new();
        for id in fact_ids {
            if !seen.insert(id.clone()) {
                continue;
            }
            let loser = self.chain.ensure_in_space(space_id, id)?;
            if loser.superseded_by.as_deref() == Some(keep_id) {
                continue;
            }
            let loser_root = self.chain.lineage_root(&loser)?;
            losers.push((loser, loser_root));
        }

        let keep_root = self.chain.lineage_root(&keep)?;

        // ── 2. Retire ──────────────────────────────────────────────────
        let now = timestamp_now();
        let mut merged: Vec<Fact> = Vec::new();
        let mut failures: Vec<ConsolidationFailure> = Vec::new();

        for (loser, loser_root) in losers {
            if let Err(e) = self.store.retire(space_id, &loser.id, keep_id, now) {
                warn!("[belief:consolidate] Could not retire {}: {}", loser.id, e);
                failures.push(failure(&loser.id, ConsolidationStage::Retire, &e));
                continue;
            }

            // ── 4. Record ──────────────────────────────────────────────
            let recorded = self
                .history
                .record(space_id, &keep_root.id, HistoryAction::Merge, Some(&loser.id), Some(keep_id), reason)
                .and_then(|_| {
                    if loser_root.id == keep_root.id {
                        return Ok(());
                    }
                    self.history
                        .record(space_id, &loser_root.id, HistoryAction::Merge, Some(&loser.id), Some(keep_id), reason)
                        .map(|_| ())
                });
            if let Err(e) = recorded {
                warn!("[belief:consolidate] Merged {} but history append failed: {}", loser.id, e);
                failures.push(failure(&loser.id, ConsolidationStage::History, &e));
            }
            merged.push(loser);
        }

        // ── 3. Aggregate ───────────────────────────────────────────────
        let aggregated = merged
            .iter()
            .map(|f| f.confidence)
            .chain(std::iter::once(keep.confidence))
            .max()
            .unwrap_or(keep.confidence)
            .min(100);
        let mut confidence = keep.confidence;
        if aggregated != keep.confidence {
            match self.store.update_confidence(space_id, keep_id, aggregated, now) {
                Ok(()) => confidence = aggregated,
                Err(e) => {
                    warn!("[belief:consolidate] Could not raise {} to confidence {}: {}", keep_id, aggregated, e);
                    failures.push(failure(keep_id, ConsolidationStage::Confidence, &e));
                }
            }
        }

        let report = ConsolidationReport {
            consolidated: failures.is_empty(),
            kept_fact_id: keep_id.to_string(),
            merged_count: merged.len(),
            merged_fact_ids: merged.into_iter().map(|f| f.id).collect(),
            failures,
            confidence,
        };

        info!(
            "[belief:consolidate] space={} keep={} merged={} failed={} confidence={}",
            space_id,
            keep_id,
            report.merged_count,
            report.failures.len(),
            report.confidence
        );
        Ok(report)
    }
}

fn failure(fact_id: &str, stage: ConsolidationStage, error: &EngineError) -> ConsolidationFailure {
    ConsolidationFailure {
        fact_id: fact_id.to_string(),
        stage,
        error: error.to_string(),
    }
}
