// ── Engram Belief Atoms: Error Types ──────────────────────────────────────
// Single canonical error enum for the belief engine, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by failure category (validation, lookup,
//     isolation, reasoner, storage…).
//   • The `#[from]` attribute wires external error conversions automatically.
//   • Validation and permission failures are always surfaced to callers.
//     Parse / timeout / provider failures are normally caught by the
//     resolver and routed to the deterministic fallback.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed caller input (empty text, confidence out of range,
    /// unknown fact/source type). Raised before any store access.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced fact is absent from the declared memory space.
    #[error("Not found: fact {fact_id} in space {space_id}")]
    NotFound { space_id: String, fact_id: String },

    /// The operation targets a fact owned by a different memory space.
    #[error("Permission denied: fact {fact_id} does not belong to space {space_id}")]
    PermissionDenied { space_id: String, fact_id: String },

    /// Reasoner output could not be turned into a decision.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Resolution failed and the deterministic fallback is disabled.
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// A decision failed structural validation.
    #[error("Invalid decision: {0}")]
    InvalidDecision(String),

    /// Optimistic concurrency check failed: the target was superseded by
    /// another writer between detection and write. Callers retry `revise`.
    #[error("Stale chain: fact {fact_id} is no longer the active version")]
    StaleChain { fact_id: String },

    /// The external reasoner did not answer within the configured bound.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Reasoner HTTP or API-level failure (non-secret detail only).
    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    /// Configuration is invalid or could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem I/O failure (config loading).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// SQLite / rusqlite database failure.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// TOML config decode failure.
    #[error("Config decode error: {0}")]
    ConfigDecode(#[from] toml::de::Error),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(space_id: impl Into<String>, fact_id: impl Into<String>) -> Self {
        Self::NotFound { space_id: space_id.into(), fact_id: fact_id.into() }
    }

    pub fn permission_denied(space_id: impl Into<String>, fact_id: impl Into<String>) -> Self {
        Self::PermissionDenied { space_id: space_id.into(), fact_id: fact_id.into() }
    }

    /// Create a provider error with name and message.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider { provider: provider.into(), message: message.into() }
    }

    /// True for failures the resolver may recover from via the fallback.
    pub fn is_recoverable_by_fallback(&self) -> bool {
        matches!(
            self,
            EngineError::Parse(_)
                | EngineError::InvalidDecision(_)
                | EngineError::Timeout(_)
                | EngineError::Provider { .. }
                | EngineError::Network(_)
                | EngineError::Serialization(_)
        )
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All engine operations return this type.
pub type EngineResult<T> = Result<T, EngineError>;
