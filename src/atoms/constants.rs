// ── Engram Belief Atoms: Constants ────────────────────────────────────────
// Named constants for the belief engine. Tunable values live in
// `engine::config::BeliefConfig`; the values here are fixed by the
// decision policy and the wire format.

// ── Heuristic resolution thresholds ───────────────────────────────────────
// Jaccard similarity above this is "the same belief" (UPDATE or NONE).
pub const SAME_BELIEF_THRESHOLD: f64 = 0.8;
// Jaccard similarity above this (and at most SAME_BELIEF_THRESHOLD) is a
// competing version of the belief (SUPERSEDE). At or below it: ADD.
pub const RELATED_BELIEF_THRESHOLD: f64 = 0.5;

// ── Decision wire defaults ────────────────────────────────────────────────
pub const DEFAULT_DECISION_CONFIDENCE: i64 = 75;
pub const DEFAULT_DECISION_REASON: &str = "No reason provided";
pub const NO_CONFLICTS_REASON: &str = "No conflicts found";

// ── Confidence bounds (integer percent) ───────────────────────────────────
pub const MIN_CONFIDENCE: i64 = 0;
pub const MAX_CONFIDENCE: i64 = 100;

// ── Config defaults ───────────────────────────────────────────────────────
pub const DEFAULT_MAX_SEMANTIC_CANDIDATES: usize = 20;
pub const DEFAULT_MAX_PROMPT_CANDIDATES: usize = 10;
pub const DEFAULT_PROMPT_TEXT_LIMIT: usize = 300;
pub const DEFAULT_REASONER_TIMEOUT_MS: u64 = 15_000;

// ── Timestamp format ──────────────────────────────────────────────────────
// Millisecond precision keeps "most recently updated" tie-breaks stable.
pub const TIMESTAMP_PRECISION: chrono::SecondsFormat = chrono::SecondsFormat::Millis;
