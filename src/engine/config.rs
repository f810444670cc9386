// ── Engram Belief: Configuration ──────────────────────────────────────────
//
// Immutable configuration values handed to the engine at construction.
// Changing configuration means building a new `BeliefEngine`; nothing here is
// global or mutable after the fact.
//
// Both structs deserialize from TOML with every field optional:
//
//   slot_matching = true
//   semantic_matching = true
//   max_semantic_candidates = 20
//   reasoner_timeout_ms = 15000
//
//   [reasoner]
//   base_url = "http://localhost:11434/v1"
//   model = "llama3.1"

use crate::atoms::constants::{
    DEFAULT_MAX_PROMPT_CANDIDATES, DEFAULT_MAX_SEMANTIC_CANDIDATES, DEFAULT_PROMPT_TEXT_LIMIT,
    DEFAULT_REASONER_TIMEOUT_MS,
};
use crate::atoms::error::{EngineError, EngineResult};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Belief revision settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BeliefConfig {
    /// Match active facts sharing subject + predicate.
    pub slot_matching: bool,
    /// Match active facts with similar text.
    pub semantic_matching: bool,
    /// Semantic matches must score strictly above this (0.0–1.0).
    pub semantic_threshold: f64,
    /// Cap on semantic matches passed downstream.
    pub max_semantic_candidates: usize,
    /// Cap on existing facts embedded in the reasoner prompt.
    pub max_prompt_candidates: usize,
    /// Fact text in the reasoner prompt is truncated to this many characters.
    pub prompt_text_limit: usize,
    /// Include illustrative examples in the reasoner system prompt.
    pub include_examples: bool,
    /// Extra guidance appended to the reasoner system prompt.
    pub custom_instructions: Option<String>,
    /// Upper bound on one reasoner round trip.
    pub reasoner_timeout_ms: u64,
    /// Route reasoner failures to the deterministic heuristic.
    pub fallback_enabled: bool,
    /// Reasoner endpoint. `None` = heuristic-only resolution.
    pub reasoner: Option<ReasonerConfig>,
}

impl Default for BeliefConfig {
    fn default() -> Self {
        Self {
            slot_matching: true,
            semantic_matching: true,
            semantic_threshold: 0.0,
            max_semantic_candidates: DEFAULT_MAX_SEMANTIC_CANDIDATES,
            max_prompt_candidates: DEFAULT_MAX_PROMPT_CANDIDATES,
            prompt_text_limit: DEFAULT_PROMPT_TEXT_LIMIT,
            include_examples: true,
            custom_instructions: None,
            reasoner_timeout_ms: DEFAULT_REASONER_TIMEOUT_MS,
            fallback_enabled: true,
            reasoner: None,
        }
    }
}

impl BeliefConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> EngineResult<Self> {
        let config: BeliefConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        info!(
            "[belief:config] Loaded {:?} (slot={} semantic={} reasoner={})",
            path,
            config.slot_matching,
            config.semantic_matching,
            config.reasoner.is_some()
        );
        Ok(config)
    }

    pub fn reasoner_timeout(&self) -> Duration {
        Duration::from_millis(self.reasoner_timeout_ms)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !(0.0..=1.0).contains(&self.semantic_threshold) {
            return Err(EngineError::Config(format!(
                "semantic_threshold {} must be within [0.0, 1.0]",
                self.semantic_threshold
            )));
        }
        if self.reasoner_timeout_ms == 0 {
            return Err(EngineError::Config("reasoner_timeout_ms must be positive".into()));
        }
        if self.max_prompt_candidates == 0 {
            return Err(EngineError::Config("max_prompt_candidates must be positive".into()));
        }
        if let Some(ref reasoner) = self.reasoner {
            reasoner.validate()?;
        }
        Ok(())
    }
}

/// OpenAI-compatible chat completion endpoint used as the reasoner.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReasonerConfig {
    /// Base URL up to and including the API version, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token. Empty for local servers.
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f64>,
    /// HTTP-level timeout, independent of `BeliefConfig::reasoner_timeout_ms`.
    pub request_timeout_secs: u64,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: String::new(),
            model: "gpt-4o-mini".into(),
            temperature: Some(0.0),
            request_timeout_secs: 60,
        }
    }
}

impl ReasonerConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(EngineError::Config("reasoner.base_url must not be empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(EngineError::Config("reasoner.model must not be empty".into()));
        }
        Ok(())
    }
}

// The API key never reaches logs.
impl std::fmt::Debug for ReasonerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasonerConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
