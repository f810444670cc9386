// ── Belief: Reasoner Prompts ───────────────────────────────────────────────
// System and user instructions sent to the external reasoner.

use crate::atoms::belief_types::{Fact, FactCandidate};
use crate::engine::config::BeliefConfig;

const SYSTEM_BASE: &str = r#"You are a belief revision assistant for an agent's long-term memory.
Given a NEW fact and a list of EXISTING facts, decide how the new fact should be stored.

Choose exactly one action:
- ADD: the new fact is new knowledge that does not conflict with any existing fact.
- UPDATE: the new fact refines an existing fact. Provide the merged statement in "mergedFact".
- SUPERSEDE: the new fact replaces an existing fact that is now outdated or wrong.
- NONE: the new fact is already captured by an existing fact; store nothing.

UPDATE and SUPERSEDE must name the existing fact in "targetFactId", using an id from the list.

Respond with a single JSON object and nothing else:
{"action": "ADD" | "UPDATE" | "SUPERSEDE" | "NONE", "targetFactId": string | null, "reason": string, "mergedFact": string | null, "confidence": number (0-100)}"#;

const SYSTEM_EXAMPLES: &str = r#"Examples:
EXISTING [f1] "User likes coffee"  NEW "User likes strong black coffee"
{"action": "UPDATE", "targetFactId": "f1", "reason": "Adds detail", "mergedFact": "User likes strong black coffee", "confidence": 85}

EXISTING [f2] "User lives in Berlin"  NEW "User moved to Lisbon"
{"action": "SUPERSEDE", "targetFactId": "f2", "reason": "Location changed", "mergedFact": null, "confidence": 90}

EXISTING [f3] "User's name is Sam"  NEW "The user is called Sam"
{"action": "NONE", "targetFactId": "f3", "reason": "Already known", "mergedFact": null, "confidence": 95}

EXISTING [f4] "User likes hiking"  NEW "User works as a nurse"
{"action": "ADD", "targetFactId": null, "reason": "Unrelated new knowledge", "mergedFact": null, "confidence": 90}"#;

/// Char-boundary-safe truncation with an ellipsis marker.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("...");
    out
}

pub(crate) fn build_system_prompt(config: &BeliefConfig) -> String {
    let mut prompt = String::from(SYSTEM_BASE);
    if config.include_examples {
        prompt.push_str("\n\n");
        prompt.push_str(SYSTEM_EXAMPLES);
    }
    if let Some(extra) = config.custom_instructions.as_deref().map(str::trim) {
        if !extra.is_empty() {
            prompt.push_str("\n\nAdditional instructions:\n");
            prompt.push_str(extra);
        }
    }
    prompt
}

fn describe_triple(
    subject: Option<&str>,
    predicate: Option<&str>,
    object: Option<&str>,
) -> Option<String> {
    if subject.is_none() && predicate.is_none() && object.is_none() {
        return None;
    }
    Some(format!(
        "({}, {}, {})",
        subject.unwrap_or("?"),
        predicate.unwrap_or("?"),
        object.unwrap_or("?")
    ))
}

pub(crate) fn build_user_prompt(
    candidate: &FactCandidate,
    existing: &[Fact],
    config: &BeliefConfig,
) -> String {
    let limit = config.prompt_text_limit;
    let mut prompt = String::from("NEW FACT:\n");
    prompt.push_str(&format!("  text: {}\n", truncate_chars(&candidate.fact, limit)));
    prompt.push_str(&format!("  type: {}\n", candidate.fact_type));
    if let Some(triple) = describe_triple(
        candidate.subject.as_deref(),
        candidate.predicate.as_deref(),
        candidate.object.as_deref(),
    ) {
        prompt.push_str(&format!("  triple: {}\n", triple));
    }
    prompt.push_str(&format!("  confidence: {}\n", candidate.confidence));

    prompt.push_str("\nEXISTING FACTS:\n");
    for fact in existing.iter().take(config.max_prompt_candidates) {
        prompt.push_str(&format!(
            "- [{}] {}",
            fact.id,
            truncate_chars(&fact.fact, limit)
        ));
        if let Some(triple) = describe_triple(
            fact.subject.as_deref(),
            fact.predicate.as_deref(),
            fact.object.as_deref(),
        ) {
            prompt.push_str(&format!(" {}", triple));
        }
        prompt.push_str(&format!(" (confidence {})\n", fact.confidence));
    }
    if existing.len() > config.max_prompt_candidates {
        prompt.push_str(&format!(
            "({} more omitted)\n",
            existing.len() - config.max_prompt_candidates
        ));
    }

    prompt.push_str("\nRespond with the JSON decision only.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::belief_types::{timestamp_now, FactType, SourceType};
    use std::collections::BTreeSet;

    fn fact(id: &str, text: &str) -> Fact {
        let now = timestamp_now();
        Fact {
            id: id.into(),
            memory_space_id: "s".into(),
            fact: text.into(),
            fact_type: FactType::Knowledge,
            subject: Some("user".into()),
            predicate: None,
            object: None,
            confidence: 60,
            source_type: SourceType::Tool,
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
        }
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn system_prompt_options() {
        let config = BeliefConfig {
            include_examples: false,
            custom_instructions: Some("Prefer manual sources.".into()),
            ..Default::default()
        };
        let prompt = build_system_prompt(&config);
        assert!(prompt.contains("SUPERSEDE"));
        assert!(!prompt.contains("Examples:"));
        assert!(prompt.ends_with("Prefer manual sources."));
        assert!(build_system_prompt(&BeliefConfig::default()).contains("Examples:"));
    }

    #[test]
    fn user_prompt_is_bounded() {
        let config = BeliefConfig {
            max_prompt_candidates: 2,
            prompt_text_limit: 8,
            ..Default::default()
        };
        let existing: Vec<Fact> = (0..4)
            .map(|i| fact(&format!("f{}", i), "a very long existing statement"))
            .collect();
        let candidate = FactCandidate::new("s", "User likes blue").with_subject("user");
        let prompt = build_user_prompt(&candidate, &existing, &config);

        assert!(prompt.contains("[f0] a very l..."));
        assert!(prompt.contains("[f1]"));
        assert!(!prompt.contains("[f2]"));
        assert!(prompt.contains("(2 more omitted)"));
        assert!(prompt.contains("triple: (user, ?, ?)"));
    }
}
