// ── Belief: Version Chain Executor ─────────────────────────────────────────
//
// Sole writer of chain fields (version, supersedes, superseded_by,
// valid_until). One transition per validated decision:
//
//   ADD        → new root, version 1, no links
//   UPDATE     → successor carries the merged text
//   SUPERSEDE  → successor carries the candidate's own text
//   NONE       → no mutation
//
// The old.superseded_by / new-row pair is written by FactStore::put_successor
// as one unit, guarded on the old version still being active.

use crate::atoms::belief_types::{
    timestamp_now, Action, ChainIssue, Decision, Fact, FactCandidate, FactFilter, SupersedeOutcome,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::FactStore;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct VersionChainExecutor {
    store: Arc<dyn FactStore>,
}

impl VersionChainExecutor {
    pub fn new(store: Arc<dyn FactStore>) -> Self {
        Self { store }
    }

    /// Fetch a fact the caller may touch. Absent from `space_id` but owned by
    /// another space is PermissionDenied; absent everywhere is NotFound.
    pub fn ensure_in_space(&self, space_id: &str, fact_id: &str) -> EngineResult<Fact> {
        if let Some(fact) = self.store.get(space_id, fact_id)? {
            return Ok(fact);
        }
        match self.store.owner_space(fact_id)? {
            Some(owner) if owner != space_id => {
                warn!(
                    "[belief:chain] Space {} tried to access fact {} owned by {}",
                    space_id, fact_id, owner
                );
                Err(EngineError::permission_denied(space_id, fact_id))
            }
            _ => Err(EngineError::not_found(space_id, fact_id)),
        }
    }

    /// Execute a validated decision. Returns the written fact (ADD, UPDATE,
    /// SUPERSEDE) or the untouched target (NONE).
    pub fn apply(&self, candidate: &FactCandidate, decision: &Decision) -> EngineResult<Option<Fact>> {
        candidate.validate()?;
        let space = candidate.memory_space_id.as_str();

        match decision.action {
            Action::Add => {
                let fact = self.store.put(&new_root(candidate, timestamp_now()))?;
                info!("[belief:chain] ADD {} in space {}", fact.id, space);
                Ok(Some(fact))
            }
            Action::Update | Action::Supersede => {
                let target_id = decision.target_fact_id.as_deref().ok_or_else(|| {
                    EngineError::InvalidDecision(format!("{} requires a targetFactId", decision.action))
                })?;
                let target = self.ensure_in_space(space, target_id)?;
                if !target.is_active() {
                    return Err(EngineError::StaleChain { fact_id: target.id });
                }

                let text = match decision.action {
                    Action::Update => decision.merged_fact.clone().ok_or_else(|| {
                        EngineError::InvalidDecision("UPDATE requires a mergedFact".into())
                    })?,
                    _ => candidate.fact.clone(),
                };

                let now = timestamp_now();
                let successor = successor_of(&target, candidate, text, now);
                let written = self.store.put_successor(&target.id, &successor, now)?;
                info!(
                    "[belief:chain] {} {} -> {} (v{})",
                    decision.action, target.id, written.id, written.version
                );
                Ok(Some(written))
            }
            Action::None => match decision.target_fact_id.as_deref() {
                Some(target_id) => Ok(Some(self.ensure_in_space(space, target_id)?)),
                None => Ok(None),
            },
        }
    }

    /// Write a candidate as a fresh lineage without conflict detection.
    pub fn add(&self, candidate: &FactCandidate) -> EngineResult<Fact> {
        candidate.validate()?;
        self.store.put(&new_root(candidate, timestamp_now()))
    }

    /// Link two existing facts: `new_id` becomes the successor of `old_id`.
    ///
    /// `old_id` must be active and `new_id` must be a standalone fact. The new
    /// fact is re-versioned to `old.version + 1` and inherits unset identity
    /// fields from the old one.
    pub fn supersede(&self, space_id: &str, old_id: &str, new_id: &str) -> EngineResult<SupersedeOutcome> {
        if old_id == new_id {
            return Err(EngineError::validation("a fact cannot supersede itself"));
        }
        let old = self.ensure_in_space(space_id, old_id)?;
        let new = self.ensure_in_space(space_id, new_id)?;

        let outcome = |superseded| SupersedeOutcome {
            superseded,
            old_fact_id: old_id.to_string(),
            new_fact_id: new_id.to_string(),
            history_error: None,
        };

        if old.superseded_by.as_deref() == Some(new_id) && new.supersedes.as_deref() == Some(old_id) {
            debug!("[belief:chain] {} already superseded by {}", old_id, new_id);
            return Ok(outcome(false));
        }
        if !old.is_active() {
            return Err(EngineError::StaleChain { fact_id: old.id });
        }
        if new.supersedes.is_some() || new.superseded_by.is_some() {
            return Err(EngineError::validation(format!(
                "fact {} already belongs to a version chain",
                new_id
            )));
        }

        let now = timestamp_now();
        let successor = Fact {
            version: old.version + 1,
            supersedes: Some(old.id.clone()),
            superseded_by: None,
            valid_until: None,
            subject: new.subject.clone().or_else(|| old.subject.clone()),
            predicate: new.predicate.clone().or_else(|| old.predicate.clone()),
            object: new.object.clone().or_else(|| old.object.clone()),
            source_ref: new.source_ref.clone().or_else(|| old.source_ref.clone()),
            participant_id: new.participant_id.clone().or_else(|| old.participant_id.clone()),
            valid_from: new.valid_from.or(old.valid_from),
            updated_at: now,
            ..new
        };
        self.store.put_successor(&old.id, &successor, now)?;
        info!("[belief:chain] Manual SUPERSEDE {} -> {} (v{})", old_id, new_id, successor.version);
        Ok(outcome(true))
    }

    /// Version-1 ancestor of `fact`, following only mutual links.
    pub fn lineage_root(&self, fact: &Fact) -> EngineResult<Fact> {
        let mut current = fact.clone();
        let mut visited = HashSet::from([current.id.clone()]);
        while let Some(prev_id) = current.supersedes.clone() {
            if !visited.insert(prev_id.clone()) {
                break;
            }
            match self.store.get(&current.memory_space_id, &prev_id)? {
                Some(prev) if prev.superseded_by.as_deref() == Some(current.id.as_str()) => {
                    current = prev;
                }
                _ => break,
            }
        }
        Ok(current)
    }

    /// Every version of the lineage containing `fact_id`, oldest first.
    /// Unknown ids and other spaces' ids yield an empty list.
    pub fn lineage(&self, space_id: &str, fact_id: &str) -> EngineResult<Vec<Fact>> {
        let Some(start) = self.store.get(space_id, fact_id)? else {
            return Ok(Vec::new());
        };
        let root = self.lineage_root(&start)?;

        let mut visited = HashSet::from([root.id.clone()]);
        let mut chain = vec![root];
        while let Some(next_id) = chain.last().and_then(|f| f.superseded_by.clone()) {
            if !visited.insert(next_id.clone()) {
                break;
            }
            let Some(tail_id) = chain.last().map(|f| f.id.clone()) else { break };
            match self.store.get(space_id, &next_id)? {
                Some(next) if next.supersedes.as_deref() == Some(tail_id.as_str()) => chain.push(next),
                _ => break,
            }
        }
        Ok(chain)
    }

    /// Walk `supersedes` back to the root and `superseded_by` forward to the
    /// active tip. Forward links include consolidation merges.
    pub fn supersession_chain(&self, space_id: &str, fact_id: &str) -> EngineResult<Vec<Fact>> {
        let Some(start) = self.store.get(space_id, fact_id)? else {
            return Ok(Vec::new());
        };
        let mut visited = HashSet::from([start.id.clone()]);

        let mut back = Vec::new();
        let mut cursor = start.supersedes.clone();
        while let Some(id) = cursor {
            if !visited.insert(id.clone()) {
                break;
            }
            match self.store.get(space_id, &id)? {
                Some(prev) => {
                    cursor = prev.supersedes.clone();
                    back.push(prev);
                }
                None => break,
            }
        }

        let mut forward = Vec::new();
        let mut cursor = start.superseded_by.clone();
        while let Some(id) = cursor {
            if !visited.insert(id.clone()) {
                break;
            }
            match self.store.get(space_id, &id)? {
                Some(next) => {
                    cursor = next.superseded_by.clone();
                    forward.push(next);
                }
                None => break,
            }
        }

        back.reverse();
        back.push(start);
        back.extend(forward);
        Ok(back)
    }

    /// Scan a space for chain integrity violations. `merged_ids` are
    /// consolidation losers whose forward link is one-directional.
    pub fn audit_chains(&self, space_id: &str, merged_ids: &HashSet<String>) -> EngineResult<Vec<ChainIssue>> {
        let facts = self.store.list(space_id, &FactFilter::all_versions())?;
        let by_id: HashMap<&str, &Fact> = facts.iter().map(|f| (f.id.as_str(), f)).collect();
        let mut issues = Vec::new();

        for fact in &facts {
            if fact.valid_until.is_some() != fact.superseded_by.is_some() {
                issues.push(ChainIssue::ValidityMismatch { fact_id: fact.id.clone() });
            }

            if let Some(ref prev_id) = fact.supersedes {
                match by_id.get(prev_id.as_str()) {
                    None => issues.push(ChainIssue::MissingLinkTarget {
                        fact_id: fact.id.clone(),
                        missing: prev_id.clone(),
                    }),
                    Some(prev) if prev.superseded_by.as_deref() != Some(fact.id.as_str()) => {
                        issues.push(ChainIssue::DanglingSuccessor {
                            fact_id: fact.id.clone(),
                            supersedes: prev_id.clone(),
                        })
                    }
                    Some(prev) if fact.version != prev.version + 1 => {
                        issues.push(ChainIssue::VersionGap {
                            fact_id: fact.id.clone(),
                            expected: prev.version + 1,
                            found: fact.version,
                        })
                    }
                    Some(_) => {}
                }
            } else if fact.version != 1 {
                issues.push(ChainIssue::VersionGap {
                    fact_id: fact.id.clone(),
                    expected: 1,
                    found: fact.version,
                });
            }

            if let Some(ref next_id) = fact.superseded_by {
                match by_id.get(next_id.as_str()) {
                    None => issues.push(ChainIssue::MissingLinkTarget {
                        fact_id: fact.id.clone(),
                        missing: next_id.clone(),
                    }),
                    Some(next)
                        if next.supersedes.as_deref() != Some(fact.id.as_str())
                            && !merged_ids.contains(&fact.id) =>
                    {
                        issues.push(ChainIssue::BrokenForwardLink {
                            fact_id: fact.id.clone(),
                            superseded_by: next_id.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        if !issues.is_empty() {
            warn!("[belief:chain] Audit of space {} found {} issue(s)", space_id, issues.len());
        }
        Ok(issues)
    }
}

fn new_root(candidate: &FactCandidate, now: DateTime<Utc>) -> Fact {
    Fact {
        id: uuid::Uuid::new_v4().to_string(),
        memory_space_id: candidate.memory_space_id.clone(),
        fact: candidate.fact.clone(),
        fact_type: candidate.fact_type,
        subject: candidate.subject.clone(),
        predicate: candidate.predicate.clone(),
        object: candidate.object.clone(),
        confidence: candidate.confidence.clamp(0, 100) as u8,
        source_type: candidate.source_type.unwrap_or_default(),
        source_ref: candidate.source_ref.clone(),
        participant_id: candidate.participant_id.clone(),
        tags: candidate.tags.clone(),
        valid_from: candidate.valid_from.or(Some(now)),
        valid_until: None,
        version: 1,
        supersedes: None,
        superseded_by: None,
        embedding: candidate.embedding.clone(),
        created_at: now,
        updated_at: now,
    }
}

/// Next version of `target`. Identity fields come from the candidate when set
/// and from the target otherwise.
fn successor_of(target: &Fact, candidate: &FactCandidate, text: String, now: DateTime<Utc>) -> Fact {
    let embedding = if text == candidate.fact { candidate.embedding.clone() } else { None };
    Fact {
        id: uuid::Uuid::new_v4().to_string(),
        memory_space_id: target.memory_space_id.clone(),
        fact: text,
        fact_type: candidate.fact_type,
        subject: candidate.subject.clone().or_else(|| target.subject.clone()),
        predicate: candidate.predicate.clone().or_else(|| target.predicate.clone()),
        object: candidate.object.clone().or_else(|| target.object.clone()),
        confidence: candidate.confidence.clamp(0, 100) as u8,
        source_type: candidate.source_type.unwrap_or(target.source_type),
        source_ref: candidate.source_ref.clone().or_else(|| target.source_ref.clone()),
        participant_id: candidate.participant_id.clone().or_else(|| target.participant_id.clone()),
        tags: if candidate.tags.is_empty() { target.tags.clone() } else { candidate.tags.clone() },
        valid_from: candidate.valid_from.or(target.valid_from),
        valid_until: None,
        version: target.version + 1,
        supersedes: Some(target.id.clone()),
        superseded_by: None,
        embedding,
        created_at: now,
        updated_at: now,
    }
}
