// ── Engram Belief Atoms: Collaborator Traits ───────────────────────────────
// The seams between the belief engine and the outside world:
//   • FactStore    — the versioned record store, keyed by memory space
//   • HistoryStore — append-only decision log
//   • Reasoner     — optional external reasoning service
//
// The SQLite-backed `engine::store::BeliefStore` implements both store
// traits; `engine::reasoner::OpenAiReasoner` implements `Reasoner`.

use crate::atoms::belief_types::{Fact, FactFilter, HistoryEntry, ScoredFact};
use crate::atoms::error::EngineResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Versioned record store. Every read is scoped to a memory space.
pub trait FactStore: Send + Sync {
    /// Fetch a fact by id within a space. `None` if absent from that space.
    fn get(&self, space_id: &str, fact_id: &str) -> EngineResult<Option<Fact>>;

    /// The space that owns a fact id, if any. Used to tell NotFound apart
    /// from PermissionDenied.
    fn owner_space(&self, fact_id: &str) -> EngineResult<Option<String>>;

    /// Create or overwrite a fact by id.
    fn put(&self, fact: &Fact) -> EngineResult<Fact>;

    /// Atomically mark `predecessor_id` as superseded by `successor` and
    /// write `successor`. Fails with `StaleChain` (writing nothing) if the
    /// predecessor already has a successor at write time.
    fn put_successor(
        &self,
        predecessor_id: &str,
        successor: &Fact,
        at: DateTime<Utc>,
    ) -> EngineResult<Fact>;

    /// Mark an active fact as superseded by `successor_id` without writing
    /// the successor. Same optimistic guard as `put_successor`.
    fn retire(
        &self,
        space_id: &str,
        fact_id: &str,
        successor_id: &str,
        at: DateTime<Utc>,
    ) -> EngineResult<()>;

    /// Set a fact's confidence in place. Chain fields are untouched.
    fn update_confidence(
        &self,
        space_id: &str,
        fact_id: &str,
        confidence: u8,
        at: DateTime<Utc>,
    ) -> EngineResult<()>;

    /// Active facts sharing subject and predicate (case-insensitive).
    fn query_by_slot(&self, space_id: &str, subject: &str, predicate: &str)
        -> EngineResult<Vec<Fact>>;

    /// Active facts ranked by similarity to `text` (cosine on embeddings
    /// when both sides have one, lexical overlap otherwise). Zero-score
    /// facts are omitted.
    fn search_similar(
        &self,
        space_id: &str,
        text: &str,
        embedding: Option<&[f32]>,
        limit: usize,
    ) -> EngineResult<Vec<ScoredFact>>;

    /// List facts in a space.
    fn list(&self, space_id: &str, filter: &FactFilter) -> EngineResult<Vec<Fact>>;
}

/// Append-only decision log.
pub trait HistoryStore: Send + Sync {
    /// Persist an entry and return it with its sequence number assigned.
    fn append_history(&self, entry: &HistoryEntry) -> EngineResult<HistoryEntry>;

    /// All entries for a lineage in a space, oldest first.
    fn history_for_lineage(&self, space_id: &str, lineage_root: &str)
        -> EngineResult<Vec<HistoryEntry>>;

    /// Every entry in a space, oldest first.
    fn history_for_space(&self, space_id: &str) -> EngineResult<Vec<HistoryEntry>>;
}

/// One request to the external reasoner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonerRequest {
    pub system: String,
    pub prompt: String,
}

/// External reasoning collaborator. Expected to answer with text containing
/// one JSON object in the decision wire shape.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn complete(&self, request: &ReasonerRequest) -> EngineResult<String>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
