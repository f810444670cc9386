// ── Engram Belief Atoms: Fact & Decision Types ────────────────────────────
//
// Type definitions for the belief revision engine: versioned facts, the
// caller's candidate observation, reconciliation decisions and the audit
// trail. These are pure data types (no DB access, no I/O).
//
// Follows the project pattern: structs in atoms/, impls in engine/.

use crate::atoms::constants::{
    DEFAULT_DECISION_REASON, MAX_CONFIDENCE, MIN_CONFIDENCE, TIMESTAMP_PRECISION,
};
use crate::atoms::error::{EngineError, EngineResult};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Current instant truncated to the precision the store persists, so a fact
/// read back from SQLite compares equal to the value that was written.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Render a timestamp the way the store persists it.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(TIMESTAMP_PRECISION, true)
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 1: Fact Classification
// ═══════════════════════════════════════════════════════════════════════════

/// What kind of knowledge a fact carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum FactType {
    Preference,
    Identity,
    #[default]
    Knowledge,
    Relationship,
    Event,
    Observation,
    Custom,
}

impl std::fmt::Display for FactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactType::Preference => write!(f, "preference"),
            FactType::Identity => write!(f, "identity"),
            FactType::Knowledge => write!(f, "knowledge"),
            FactType::Relationship => write!(f, "relationship"),
            FactType::Event => write!(f, "event"),
            FactType::Observation => write!(f, "observation"),
            FactType::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for FactType {
    type Err = EngineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "preference" => Ok(FactType::Preference),
            "identity" => Ok(FactType::Identity),
            "knowledge" => Ok(FactType::Knowledge),
            "relationship" => Ok(FactType::Relationship),
            "event" => Ok(FactType::Event),
            "observation" => Ok(FactType::Observation),
            "custom" => Ok(FactType::Custom),
            other => Err(EngineError::validation(format!("Unknown fact type: {}", other))),
        }
    }
}

/// Where an observation came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Conversation,
    System,
    Tool,
    Manual,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Conversation => write!(f, "conversation"),
            SourceType::System => write!(f, "system"),
            SourceType::Tool => write!(f, "tool"),
            SourceType::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = EngineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conversation" => Ok(SourceType::Conversation),
            "system" => Ok(SourceType::System),
            "tool" => Ok(SourceType::Tool),
            "manual" => Ok(SourceType::Manual),
            other => Err(EngineError::validation(format!("Unknown source type: {}", other))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 2: Facts
// ═══════════════════════════════════════════════════════════════════════════

/// A stored fact — one version in a lineage.
///
/// Chain fields (`version`, `supersedes`, `superseded_by`, `valid_until`)
/// are written only by the version chain executor and the consolidator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    pub id: String,
    pub memory_space_id: String,
    /// Natural-language statement.
    pub fact: String,
    pub fact_type: FactType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    /// Integer percent, 0–100.
    pub confidence: u8,
    pub source_type: SourceType,
    /// Opaque pointer into the transcript / vector collaborators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    /// Identity of the agent or tool that produced the observation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    /// Set exactly when `superseded_by` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    /// Position in the lineage, starting at 1.
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
    /// Caller-supplied embedding (never computed here).
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fact {
    /// The active version of a lineage has no successor.
    pub fn is_active(&self) -> bool {
        self.superseded_by.is_none()
    }

    /// A lineage root has no predecessor.
    pub fn is_root(&self) -> bool {
        self.supersedes.is_none()
    }
}

/// A new observation to reconcile against the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FactCandidate {
    pub memory_space_id: String,
    pub fact: String,
    #[serde(default)]
    pub fact_type: FactType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    /// Signed so out-of-range input can be rejected rather than wrapped.
    pub confidence: i64,
    /// Identity fields below are inherited from the target version when
    /// left unset on an UPDATE / SUPERSEDE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

impl FactCandidate {
    /// Create a candidate with the given text in a memory space.
    pub fn new(memory_space_id: impl Into<String>, fact: impl Into<String>) -> Self {
        Self {
            memory_space_id: memory_space_id.into(),
            fact: fact.into(),
            fact_type: FactType::default(),
            subject: None,
            predicate: None,
            object: None,
            confidence: 50,
            source_type: None,
            source_ref: None,
            participant_id: None,
            tags: BTreeSet::new(),
            valid_from: None,
            embedding: None,
        }
    }

    pub fn with_type(mut self, fact_type: FactType) -> Self {
        self.fact_type = fact_type;
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn with_object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Set subject, predicate and object at once.
    pub fn with_triple(
        self,
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        self.with_subject(subject).with_predicate(predicate).with_object(object)
    }

    pub fn with_confidence(mut self, confidence: i64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_source(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }

    pub fn with_source_ref(mut self, source_ref: impl Into<String>) -> Self {
        self.source_ref = Some(source_ref.into());
        self
    }

    pub fn with_participant(mut self, participant_id: impl Into<String>) -> Self {
        self.participant_id = Some(participant_id.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_valid_from(mut self, valid_from: DateTime<Utc>) -> Self {
        self.valid_from = Some(valid_from);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Reject malformed input before any store access.
    pub fn validate(&self) -> EngineResult<()> {
        if self.memory_space_id.trim().is_empty() {
            return Err(EngineError::validation("memory space id must not be empty"));
        }
        if self.fact.trim().is_empty() {
            return Err(EngineError::validation("fact text must not be empty"));
        }
        if !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&self.confidence) {
            return Err(EngineError::validation(format!(
                "confidence {} out of range [{}, {}]",
                self.confidence, MIN_CONFIDENCE, MAX_CONFIDENCE
            )));
        }
        Ok(())
    }
}

/// A fact with a similarity score in 0.0–1.0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredFact {
    pub fact: Fact,
    pub score: f64,
}

/// Filter for listing facts in a memory space.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact_type: Option<FactType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<u8>,
    /// Include superseded versions (default: active only).
    #[serde(default)]
    pub include_superseded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl FactFilter {
    /// Active and superseded versions alike.
    pub fn all_versions() -> Self {
        Self {
            include_superseded: true,
            ..Default::default()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 3: Decisions
// ═══════════════════════════════════════════════════════════════════════════

/// Reconciliation action for a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// New knowledge: start a lineage.
    Add,
    /// Refine the target in place: successor carries the merged text.
    Update,
    /// Replace the target: successor carries the candidate's own text.
    Supersede,
    /// Redundant: nothing is written except the audit entry.
    None,
}

impl Action {
    /// Actions that extend an existing lineage.
    pub fn requires_target(&self) -> bool {
        matches!(self, Action::Update | Action::Supersede)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Add => write!(f, "ADD"),
            Action::Update => write!(f, "UPDATE"),
            Action::Supersede => write!(f, "SUPERSEDE"),
            Action::None => write!(f, "NONE"),
        }
    }
}

impl std::str::FromStr for Action {
    type Err = EngineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ADD" => Ok(Action::Add),
            "UPDATE" => Ok(Action::Update),
            "SUPERSEDE" => Ok(Action::Supersede),
            "NONE" => Ok(Action::None),
            other => Err(EngineError::Parse(format!("Invalid action: {}", other))),
        }
    }
}

/// One reconciliation decision. Ephemeral — never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub action: Action,
    /// Required for UPDATE / SUPERSEDE.
    pub target_fact_id: Option<String>,
    pub reason: String,
    /// Required for UPDATE.
    pub merged_fact: Option<String>,
    /// Integer percent; may be out of range until validated.
    pub confidence: i64,
}

impl Decision {
    pub fn add(reason: impl Into<String>, confidence: i64) -> Self {
        Self {
            action: Action::Add,
            target_fact_id: None,
            reason: reason.into(),
            merged_fact: None,
            confidence,
        }
    }

    pub fn update(
        target_fact_id: impl Into<String>,
        merged_fact: impl Into<String>,
        reason: impl Into<String>,
        confidence: i64,
    ) -> Self {
        Self {
            action: Action::Update,
            target_fact_id: Some(target_fact_id.into()),
            reason: reason.into(),
            merged_fact: Some(merged_fact.into()),
            confidence,
        }
    }

    pub fn supersede(
        target_fact_id: impl Into<String>,
        reason: impl Into<String>,
        confidence: i64,
    ) -> Self {
        Self {
            action: Action::Supersede,
            target_fact_id: Some(target_fact_id.into()),
            reason: reason.into(),
            merged_fact: None,
            confidence,
        }
    }

    pub fn none(target_fact_id: Option<String>, reason: impl Into<String>, confidence: i64) -> Self {
        Self {
            action: Action::None,
            target_fact_id,
            reason: reason.into(),
            merged_fact: None,
            confidence,
        }
    }
}

impl Default for Decision {
    fn default() -> Self {
        Self::add(DEFAULT_DECISION_REASON, crate::atoms::constants::DEFAULT_DECISION_CONFIDENCE)
    }
}

/// Which strategy produced a decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    /// The external reasoner answered with a valid decision.
    Reasoner,
    /// The deterministic heuristic was the configured strategy.
    Heuristic,
    /// The reasoner failed and the heuristic stood in.
    Fallback,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 4: Audit Trail
// ═══════════════════════════════════════════════════════════════════════════

/// Kinds of history entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HistoryAction {
    Add,
    Update,
    Supersede,
    None,
    /// A fact was folded into a survivor by consolidation.
    Merge,
}

impl From<Action> for HistoryAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Add => HistoryAction::Add,
            Action::Update => HistoryAction::Update,
            Action::Supersede => HistoryAction::Supersede,
            Action::None => HistoryAction::None,
        }
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryAction::Add => write!(f, "ADD"),
            HistoryAction::Update => write!(f, "UPDATE"),
            HistoryAction::Supersede => write!(f, "SUPERSEDE"),
            HistoryAction::None => write!(f, "NONE"),
            HistoryAction::Merge => write!(f, "MERGE"),
        }
    }
}

impl std::str::FromStr for HistoryAction {
    type Err = EngineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADD" => Ok(HistoryAction::Add),
            "UPDATE" => Ok(HistoryAction::Update),
            "SUPERSEDE" => Ok(HistoryAction::Supersede),
            "NONE" => Ok(HistoryAction::None),
            "MERGE" => Ok(HistoryAction::Merge),
            other => Err(EngineError::validation(format!("Unknown history action: {}", other))),
        }
    }
}

/// An append-only record of one executed decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Store-assigned sequence number (0 before the entry is persisted).
    pub seq: i64,
    pub memory_space_id: String,
    /// Version-1 fact of the lineage this entry belongs to.
    pub lineage_root: String,
    pub action: HistoryAction,
    pub old_fact_id: Option<String>,
    pub new_fact_id: Option<String>,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 5: Operation Results
// ═══════════════════════════════════════════════════════════════════════════

/// Result of conflict detection for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub has_conflicts: bool,
    /// Active facts sharing subject and predicate.
    pub slot_conflicts: Vec<Fact>,
    /// Active facts with similar text, ranked, excluding slot conflicts.
    pub semantic_conflicts: Vec<ScoredFact>,
    /// Unauthoritative hint.
    pub recommended_action: Action,
}

impl ConflictReport {
    pub fn empty() -> Self {
        Self {
            has_conflicts: false,
            slot_conflicts: Vec::new(),
            semantic_conflicts: Vec::new(),
            recommended_action: Action::Add,
        }
    }

    /// Slot conflicts followed by semantic conflicts, each fact once.
    pub fn candidates(&self) -> Vec<Fact> {
        let mut seen = HashSet::new();
        self.slot_conflicts
            .iter()
            .chain(self.semantic_conflicts.iter().map(|s| &s.fact))
            .filter(|f| seen.insert(f.id.clone()))
            .cloned()
            .collect()
    }
}

/// Result of `revise`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionOutcome {
    pub action: Action,
    /// ADD: the new fact. UPDATE / SUPERSEDE: the new active version.
    /// NONE: the existing target, if the decision named one.
    pub fact: Option<Fact>,
    pub decision: Decision,
    pub resolved_by: ResolutionSource,
    /// Set when the chain write committed but its history entry could not be
    /// appended. The fact state above is authoritative either way.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_error: Option<String>,
}

/// Result of a manual supersession.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SupersedeOutcome {
    /// False when the link already existed.
    pub superseded: bool,
    pub old_fact_id: String,
    pub new_fact_id: String,
    /// Set when the link committed but its history entry could not be appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_error: Option<String>,
}

/// Consolidation step that failed for one fact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConsolidationStage {
    /// The loser was not relinked and is still active.
    Retire,
    /// The loser was relinked but its MERGE entry is missing.
    History,
    /// Losers were relinked but the survivor kept its old confidence.
    Confidence,
}

/// A fact whose part of the consolidation did not complete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationFailure {
    pub fact_id: String,
    pub stage: ConsolidationStage,
    pub error: String,
}

/// Result of `consolidate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationReport {
    /// True only when every loser was relinked and recorded and the survivor's
    /// confidence was written.
    pub consolidated: bool,
    pub kept_fact_id: String,
    pub merged_count: usize,
    pub merged_fact_ids: Vec<String>,
    pub failures: Vec<ConsolidationFailure>,
    /// Survivor confidence after aggregation.
    pub confidence: u8,
}

impl ConsolidationReport {
    /// Some writes landed and others did not.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty() && self.merged_count > 0
    }
}

/// A chain integrity violation found by `audit_chains`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChainIssue {
    /// A version names a predecessor that does not point back to it.
    DanglingSuccessor { fact_id: String, supersedes: String },
    /// A version points forward to a fact whose supersedes link disagrees.
    /// Consolidation merges are exempt.
    BrokenForwardLink { fact_id: String, superseded_by: String },
    /// `valid_until` and `superseded_by` disagree on presence.
    ValidityMismatch { fact_id: String },
    /// Successor version is not predecessor version + 1.
    VersionGap { fact_id: String, expected: u32, found: u32 },
    /// A link names a fact that does not exist in the space.
    MissingLinkTarget { fact_id: String, missing: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_builder() {
        let c = FactCandidate::new("space-1", "User likes blue")
            .with_type(FactType::Preference)
            .with_triple("user", "favorite_color", "blue")
            .with_confidence(90)
            .with_tags(["color", "prefs"]);
        assert_eq!(c.subject.as_deref(), Some("user"));
        assert_eq!(c.fact_type, FactType::Preference);
        assert_eq!(c.tags.len(), 2);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_candidate_validation() {
        assert!(FactCandidate::new("s", "   ").validate().is_err());
        assert!(FactCandidate::new("s", "x").with_confidence(101).validate().is_err());
        assert!(FactCandidate::new("s", "x").with_confidence(-1).validate().is_err());
        assert!(FactCandidate::new("", "x").validate().is_err());
        assert!(FactCandidate::new("s", "x").with_confidence(0).validate().is_ok());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Preference".parse::<FactType>().unwrap(), FactType::Preference);
        assert_eq!(" tool ".parse::<SourceType>().unwrap(), SourceType::Tool);
        assert!(matches!("opinion".parse::<FactType>(), Err(EngineError::Validation(_))));
        assert!(matches!("email".parse::<SourceType>(), Err(EngineError::Validation(_))));
        assert_eq!("supersede".parse::<Action>().unwrap(), Action::Supersede);
        match "MERGE".parse::<Action>() {
            Err(EngineError::Parse(msg)) => assert!(msg.starts_with("Invalid action")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_action_wire_names() {
        assert_eq!(serde_json::to_string(&Action::None).unwrap(), "\"NONE\"");
        assert_eq!(serde_json::to_string(&FactType::Event).unwrap(), "\"event\"");
        assert!(Action::Update.requires_target());
        assert!(!Action::None.requires_target());
    }

    #[test]
    fn test_conflict_report_candidates_dedup() {
        let now = timestamp_now();
        let fact = Fact {
            id: "f1".into(),
            memory_space_id: "s".into(),
            fact: "a".into(),
            fact_type: FactType::Knowledge,
            subject: None,
            predicate: None,
            object: None,
            confidence: 50,
            source_type: SourceType::System,
            source_ref: None,
            participant_id: None,
            tags: BTreeSet::new(),
            valid_from: None,
            valid_until: None,
            version: 1,
            supersedes: None,
            superseded_by: None,
            embedding: None,
            created_at: now,
            updated_at: now,
        };
        let report = ConflictReport {
            has_conflicts: true,
            slot_conflicts: vec![fact.clone()],
            semantic_conflicts: vec![ScoredFact { fact, score: 0.9 }],
            recommended_action: Action::Supersede,
        };
        assert_eq!(report.candidates().len(), 1);
    }
}
