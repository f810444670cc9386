// ── Engram Belief Atoms Layer ──────────────────────────────────────────────
// Pure types, constants, error types and collaborator traits — no I/O.
// Dependency rule: atoms may only depend on std and external pure crates.
// Nothing here may import from engine/.

pub mod belief_types;
pub mod constants;
pub mod error;
pub mod traits;
