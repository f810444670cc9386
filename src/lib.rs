// Engram Belief — library root
//
// atoms/  — pure types, constants, errors and collaborator traits
// engine/ — store, reasoner and the belief revision pipeline

pub mod atoms;
pub mod engine;

pub use atoms::belief_types::{
    Action, ChainIssue, ConflictReport, ConsolidationFailure, ConsolidationReport,
    ConsolidationStage, Decision, Fact, FactCandidate, FactFilter, FactType, HistoryAction,
    HistoryEntry, ResolutionSource, RevisionOutcome, ScoredFact, SourceType, SupersedeOutcome,
};
pub use atoms::error::{EngineError, EngineResult};
pub use atoms::traits::{FactStore, HistoryStore, Reasoner, ReasonerRequest};
pub use engine::belief::decision::{decision_to_wire, parse_decision, validate_decision};
pub use engine::belief::BeliefEngine;
pub use engine::config::{BeliefConfig, ReasonerConfig};
pub use engine::reasoner::OpenAiReasoner;
pub use engine::store::BeliefStore;
