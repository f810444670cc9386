// ── Belief: Decision Wire Boundary ─────────────────────────────────────────
//
// The only place reasoner text becomes a `Decision`:
//   parse_decision     — first balanced JSON object → strict wire struct → Decision
//   decision_to_wire   — inverse, used for logs and tests
//   validate_decision  — structural checks before execution
//
// Wire shape:
//   {"action": "ADD"|"UPDATE"|"SUPERSEDE"|"NONE", "targetFactId": string|null,
//    "reason": string, "mergedFact": string|null, "confidence": number}

use crate::atoms::belief_types::{Action, Decision};
use crate::atoms::constants::{
    DEFAULT_DECISION_CONFIDENCE, DEFAULT_DECISION_REASON, MAX_CONFIDENCE, MIN_CONFIDENCE,
};
use crate::atoms::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecisionWire {
    action: String,
    #[serde(default)]
    target_fact_id: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    merged_fact: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// The balanced `{...}` opening at byte `start`, if it closes. Braces inside
/// JSON strings (including escaped quotes) do not count.
fn balanced_object_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// First balanced object in `text` that deserializes as a decision. Stray or
/// non-JSON brace groups in the surrounding prose are skipped.
fn extract_decision_wire(text: &str) -> EngineResult<DecisionWire> {
    let mut last_error: Option<serde_json::Error> = None;
    for (start, _) in text.match_indices('{') {
        let Some(raw) = balanced_object_at(text, start) else {
            continue;
        };
        match serde_json::from_str::<DecisionWire>(raw) {
            Ok(wire) => return Ok(wire),
            Err(e) => last_error = Some(e),
        }
    }
    Err(match last_error {
        Some(e) => EngineError::Parse(format!("Failed to parse JSON: {}", e)),
        None => EngineError::Parse("No JSON object found".into()),
    })
}

/// Parse reasoner output into a decision. Prose around the JSON is ignored.
pub fn parse_decision(text: &str) -> EngineResult<Decision> {
    let wire = extract_decision_wire(text)?;
    let action: Action = wire.action.parse()?;

    Ok(Decision {
        action,
        target_fact_id: wire.target_fact_id,
        reason: wire.reason.unwrap_or_else(|| DEFAULT_DECISION_REASON.to_string()),
        merged_fact: wire.merged_fact,
        confidence: wire
            .confidence
            .map(|c| c.round() as i64)
            .unwrap_or(DEFAULT_DECISION_CONFIDENCE),
    })
}

/// Render a decision in the wire shape. `parse_decision` reverses this exactly.
pub fn decision_to_wire(decision: &Decision) -> String {
    serde_json::json!({
        "action": decision.action.to_string(),
        "targetFactId": decision.target_fact_id,
        "reason": decision.reason,
        "mergedFact": decision.merged_fact,
        "confidence": decision.confidence,
    })
    .to_string()
}

/// Reject structurally invalid decisions before they reach the store.
pub fn validate_decision(decision: &Decision, candidate_ids: &[String]) -> EngineResult<()> {
    if decision.action.requires_target() && decision.target_fact_id.is_none() {
        return Err(EngineError::InvalidDecision(format!(
            "{} requires a targetFactId",
            decision.action
        )));
    }
    if decision.action == Action::Update && decision.merged_fact.is_none() {
        return Err(EngineError::InvalidDecision(
            "UPDATE requires a mergedFact".into(),
        ));
    }
    if let Some(ref target) = decision.target_fact_id {
        if !candidate_ids.iter().any(|id| id == target) {
            return Err(EngineError::InvalidDecision(format!(
                "Target fact {} not found among candidates",
                target
            )));
        }
    }
    if !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&decision.confidence) {
        return Err(EngineError::InvalidDecision(format!(
            "Confidence {} out of range [{}, {}]",
            decision.confidence, MIN_CONFIDENCE, MAX_CONFIDENCE
        )));
    }
    Ok(())
}
