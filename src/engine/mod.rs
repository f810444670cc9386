// Engram Belief Engine — belief revision over a versioned fact store
// Conflict detection, decision resolution (reasoner or heuristic), and
// version-chained persistence with an append-only audit trail.

pub mod belief;
pub mod config;
pub mod reasoner;
pub mod store;
