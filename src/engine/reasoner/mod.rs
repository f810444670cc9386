// Engram Belief — Reasoner Backends
// Concrete implementations of `atoms::traits::Reasoner`.

mod openai;

pub use openai::OpenAiReasoner;

use crate::atoms::error::EngineResult;
use crate::atoms::traits::Reasoner;
use crate::engine::config::ReasonerConfig;
use std::sync::Arc;

/// Build the reasoner described by a config section.
pub fn reasoner_from_config(config: &ReasonerConfig) -> EngineResult<Arc<dyn Reasoner>> {
    Ok(Arc::new(OpenAiReasoner::new(config)?))
}
