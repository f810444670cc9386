// Engram Belief — Belief Revision Pipeline
//
// candidate → ConflictDetector → DecisionResolver → validate_decision
//           → VersionChainExecutor → HistoryRecorder
//
// Consolidator and manual supersession bypass detection and resolution.
//
// Module layout:
//   similarity    — word sets, Jaccard, text normalization
//   conflict      — ConflictDetector (slot + semantic match)
//   prompt        — reasoner system / user instructions
//   decision      — wire parse / render / validate
//   resolver      — DecisionResolver trait, heuristic + reasoner strategies
//   version_chain — VersionChainExecutor (sole writer of chain fields)
//   history       — HistoryRecorder (append-only audit trail)
//   consolidation — Consolidator (batch merge into one survivor)

pub mod conflict;
pub mod consolidation;
pub mod decision;
pub mod history;
pub(crate) mod prompt;
pub mod resolver;
pub mod similarity;
pub mod version_chain;

use crate::atoms::belief_types::{
    Action, ChainIssue, ConflictReport, ConsolidationReport, Fact, FactCandidate, FactFilter,
    HistoryAction, HistoryEntry, RevisionOutcome, SupersedeOutcome,
};
use crate::atoms::error::EngineResult;
use crate::atoms::traits::{FactStore, HistoryStore, Reasoner};
use crate::engine::config::BeliefConfig;
use crate::engine::reasoner::reasoner_from_config;
use crate::engine::store::BeliefStore;
use conflict::ConflictDetector;
use consolidation::Consolidator;
use decision::validate_decision;
use history::HistoryRecorder;
use log::{info, warn};
use resolver::{build_resolver, DecisionResolver};
use std::sync::Arc;
use version_chain::VersionChainExecutor;

const MANUAL_SUPERSEDE_REASON: &str = "Manual supersession";
const DIRECT_STORE_REASON: &str = "Stored directly";

/// Caller-facing belief revision engine for one configuration.
pub struct BeliefEngine {
    config: BeliefConfig,
    facts: Arc<dyn FactStore>,
    detector: ConflictDetector,
    resolver: Arc<dyn DecisionResolver>,
    chain: Arc<VersionChainExecutor>,
    history: Arc<HistoryRecorder>,
    consolidator: Consolidator,
}

impl BeliefEngine {
    /// Engine over a SQLite store. A `[reasoner]` config section enables the
    /// reasoner-backed resolver.
    pub fn new(store: Arc<BeliefStore>, config: BeliefConfig) -> EngineResult<Self> {
        Self::from_parts(store.clone(), store, config, None)
    }

    /// Engine over a SQLite store with an explicit reasoner.
    pub fn with_reasoner(
        store: Arc<BeliefStore>,
        config: BeliefConfig,
        reasoner: Arc<dyn Reasoner>,
    ) -> EngineResult<Self> {
        Self::from_parts(store.clone(), store, config, Some(reasoner))
    }

    /// Engine over a fresh in-memory store.
    pub fn in_memory(config: BeliefConfig) -> EngineResult<Self> {
        Self::new(Arc::new(BeliefStore::open_in_memory()?), config)
    }

    /// Assemble the pipeline from arbitrary collaborators.
    pub fn from_parts(
        facts: Arc<dyn FactStore>,
        history_store: Arc<dyn HistoryStore>,
        config: BeliefConfig,
        reasoner: Option<Arc<dyn Reasoner>>,
    ) -> EngineResult<Self> {
        config.validate()?;

        let reasoner = match (reasoner, config.reasoner.as_ref()) {
            (Some(r), _) => Some(r),
            (None, Some(section)) => Some(reasoner_from_config(section)?),
            (None, None) => None,
        };

        let detector = ConflictDetector::new(facts.clone(), &config);
        let resolver = build_resolver(&config, reasoner);
        let chain = Arc::new(VersionChainExecutor::new(facts.clone()));
        let history = Arc::new(HistoryRecorder::new(history_store));
        let consolidator = Consolidator::new(facts.clone(), chain.clone(), history.clone());

        info!(
            "[belief:engine] Ready (resolver={} slot={} semantic={})",
            resolver.name(),
            config.slot_matching,
            config.semantic_matching
        );

        Ok(Self {
            config,
            facts,
            detector,
            resolver,
            chain,
            history,
            consolidator,
        })
    }

    pub fn config(&self) -> &BeliefConfig {
        &self.config
    }

    /// Name of the active resolution strategy.
    pub fn resolver_name(&self) -> &str {
        self.resolver.name()
    }

    // ── Revision ───────────────────────────────────────────────────────────

    pub fn check_conflicts(&self, candidate: &FactCandidate) -> EngineResult<ConflictReport> {
        self.detector.detect(candidate)
    }

    /// Reconcile a candidate against the knowledge base and apply the outcome.
    ///
    /// A `StaleChain` error means another writer superseded the target first;
    /// re-running `revise` starts over from conflict detection.
    pub async fn revise(&self, candidate: &FactCandidate) -> EngineResult<RevisionOutcome> {
        candidate.validate()?;
        let space = candidate.memory_space_id.as_str();

        let report = self.detector.detect(candidate)?;
        let conflicts = report.candidates();
        let resolution = self.resolver.resolve(candidate, &conflicts).await?;

        let ids: Vec<String> = conflicts.iter().map(|f| f.id.clone()).collect();
        validate_decision(&resolution.decision, &ids)?;

        let decision = resolution.decision;
        let fact = self.chain.apply(candidate, &decision)?;

        let recorded = match (decision.action, fact.as_ref()) {
            (Action::Add, Some(new)) => self
                .history
                .record(space, &new.id, HistoryAction::Add, None, Some(&new.id), &decision.reason)
                .map(|_| ()),
            (Action::Update | Action::Supersede, Some(new)) => {
                self.chain.lineage_root(new).and_then(|root| {
                    self.history
                        .record(
                            space,
                            &root.id,
                            decision.action.into(),
                            new.supersedes.as_deref(),
                            Some(&new.id),
                            &decision.reason,
                        )
                        .map(|_| ())
                })
            }
            (Action::None, Some(target)) => self.chain.lineage_root(target).and_then(|root| {
                self.history
                    .record(space, &root.id, HistoryAction::None, Some(&target.id), None, &decision.reason)
                    .map(|_| ())
            }),
            _ => Ok(()),
        };
        let history_error = history_failure(recorded, space, fact.as_ref().map(|f| f.id.as_str()));

        info!(
            "[belief:engine] revise space={} action={} via {:?}",
            space, decision.action, resolution.source
        );

        Ok(RevisionOutcome {
            action: decision.action,
            fact,
            decision,
            resolved_by: resolution.source,
            history_error,
        })
    }

    /// Store a candidate as a new lineage without conflict detection.
    pub fn store_fact(&self, candidate: &FactCandidate) -> EngineResult<Fact> {
        let fact = self.chain.add(candidate)?;
        self.history.record(
            &fact.memory_space_id,
            &fact.id,
            HistoryAction::Add,
            None,
            Some(&fact.id),
            DIRECT_STORE_REASON,
        )?;
        Ok(fact)
    }

    // ── Direct chain operations ────────────────────────────────────────────

    pub fn supersede(
        &self,
        space_id: &str,
        old_id: &str,
        new_id: &str,
        reason: Option<&str>,
    ) -> EngineResult<SupersedeOutcome> {
        let mut outcome = self.chain.supersede(space_id, old_id, new_id)?;
        if outcome.superseded {
            let recorded = self
                .chain
                .ensure_in_space(space_id, old_id)
                .and_then(|old| self.chain.lineage_root(&old))
                .and_then(|root| {
                    self.history.record(
                        space_id,
                        &root.id,
                        HistoryAction::Supersede,
                        Some(old_id),
                        Some(new_id),
                        reason.unwrap_or(MANUAL_SUPERSEDE_REASON),
                    )
                })
                .map(|_| ());
            outcome.history_error = history_failure(recorded, space_id, Some(new_id));
        }
        Ok(outcome)
    }

    pub fn consolidate(
        &self,
        space_id: &str,
        fact_ids: &[String],
        keep_id: &str,
        reason: Option<&str>,
    ) -> EngineResult<ConsolidationReport> {
        self.consolidator.consolidate(space_id, fact_ids, keep_id, reason)
    }

    // ── Queries ────────────────────────────────────────────────────────────

    /// History of the lineage containing `fact_id`, oldest first. Empty for
    /// unknown ids and ids outside `space_id`.
    pub fn get_history(&self, space_id: &str, fact_id: &str) -> EngineResult<Vec<HistoryEntry>> {
        let Some(fact) = self.facts.get(space_id, fact_id)? else {
            return Ok(Vec::new());
        };
        let root = self.chain.lineage_root(&fact)?;
        self.history.get_history(space_id, &root.id)
    }

    pub fn get_supersession_chain(&self, space_id: &str, fact_id: &str) -> EngineResult<Vec<Fact>> {
        self.chain.supersession_chain(space_id, fact_id)
    }

    pub fn get_lineage(&self, space_id: &str, fact_id: &str) -> EngineResult<Vec<Fact>> {
        self.chain.lineage(space_id, fact_id)
    }

    pub fn get_fact(&self, space_id: &str, fact_id: &str) -> EngineResult<Option<Fact>> {
        self.facts.get(space_id, fact_id)
    }

    pub fn list_facts(&self, space_id: &str, filter: &FactFilter) -> EngineResult<Vec<Fact>> {
        self.facts.list(space_id, filter)
    }

    /// Chain integrity report for a space.
    pub fn audit_chains(&self, space_id: &str) -> EngineResult<Vec<ChainIssue>> {
        let merged = self.history.merged_fact_ids(space_id)?;
        self.chain.audit_chains(space_id, &merged)
    }
}

/// A chain write has already committed when history is appended, so an
/// append failure is reported on the outcome instead of failing the call.
fn history_failure(recorded: EngineResult<()>, space_id: &str, fact_id: Option<&str>) -> Option<String> {
    let error = recorded.err()?;
    warn!(
        "[belief:engine] space={} fact={:?} committed without history: {}",
        space_id, fact_id, error
    );
    Some(error.to_string())
}
