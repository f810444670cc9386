// ── Belief: Conflict Detection ─────────────────────────────────────────────
//
// Gathers the active facts a candidate might collide with:
//   • slot match     — same subject + predicate (case-insensitive)
//   • semantic match — similar text, ranked by the store, capped
//
// Read-only. The recommended action in the report is a hint; the resolver
// makes the actual decision.

use crate::atoms::belief_types::{Action, ConflictReport, FactCandidate, ScoredFact};
use crate::atoms::error::EngineResult;
use crate::atoms::traits::FactStore;
use crate::engine::belief::similarity::normalize_text;
use crate::engine::config::BeliefConfig;
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

pub struct ConflictDetector {
    store: Arc<dyn FactStore>,
    slot_matching: bool,
    semantic_matching: bool,
    semantic_threshold: f64,
    max_semantic_candidates: usize,
}

impl ConflictDetector {
    pub fn new(store: Arc<dyn FactStore>, config: &BeliefConfig) -> Self {
        Self {
            store,
            slot_matching: config.slot_matching,
            semantic_matching: config.semantic_matching,
            semantic_threshold: config.semantic_threshold,
            max_semantic_candidates: config.max_semantic_candidates,
        }
    }

    /// Find active facts in the candidate's space that may conflict with it.
    pub fn detect(&self, candidate: &FactCandidate) -> EngineResult<ConflictReport> {
        candidate.validate()?;
        let space = candidate.memory_space_id.as_str();

        let slot_conflicts = match (self.slot_matching, &candidate.subject, &candidate.predicate) {
            (true, Some(subject), Some(predicate))
                if !subject.trim().is_empty() && !predicate.trim().is_empty() =>
            {
                self.store.query_by_slot(space, subject, predicate)?
            }
            _ => Vec::new(),
        };

        let semantic_conflicts: Vec<ScoredFact> =
            if self.semantic_matching && self.max_semantic_candidates > 0 {
                let slot_ids: HashSet<&str> = slot_conflicts.iter().map(|f| f.id.as_str()).collect();
                // Over-fetch so slot duplicates don't eat into the cap.
                let fetched = self.store.search_similar(
                    space,
                    &candidate.fact,
                    candidate.embedding.as_deref(),
                    self.max_semantic_candidates + slot_conflicts.len(),
                )?;
                fetched
                    .into_iter()
                    .filter(|s| s.score > self.semantic_threshold)
                    .filter(|s| !slot_ids.contains(s.fact.id.as_str()))
                    .take(self.max_semantic_candidates)
                    .collect()
            } else {
                Vec::new()
            };

        let has_conflicts = !slot_conflicts.is_empty() || !semantic_conflicts.is_empty();
        if !has_conflicts {
            debug!("[belief:conflict] No conflicts for candidate in space {}", space);
            return Ok(ConflictReport::empty());
        }

        let normalized = normalize_text(&candidate.fact);
        let duplicate = slot_conflicts
            .iter()
            .chain(semantic_conflicts.iter().map(|s| &s.fact))
            .any(|f| normalize_text(&f.fact) == normalized);

        let recommended_action = if duplicate {
            Action::None
        } else if !slot_conflicts.is_empty() {
            Action::Supersede
        } else {
            Action::Update
        };

        debug!(
            "[belief:conflict] space={} slot={} semantic={} hint={}",
            space,
            slot_conflicts.len(),
            semantic_conflicts.len(),
            recommended_action
        );

        Ok(ConflictReport {
            has_conflicts,
            slot_conflicts,
            semantic_conflicts,
            recommended_action,
        })
    }
}
