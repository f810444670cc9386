// ── Belief: Decision Resolution ────────────────────────────────────────────
//
// Turns (candidate, conflicting facts) into one Decision.
//
//   HeuristicResolver — deterministic word-overlap policy, no I/O
//   ReasonerResolver  — asks the external reasoner, bounded by a timeout,
//                       and falls back to the heuristic on any failure
//
// The strategy is chosen once by `build_resolver`. Reconfiguring means
// building a new resolver.

use crate::atoms::belief_types::{Decision, Fact, FactCandidate, ResolutionSource};
use crate::atoms::constants::{NO_CONFLICTS_REASON, RELATED_BELIEF_THRESHOLD, SAME_BELIEF_THRESHOLD};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{Reasoner, ReasonerRequest};
use crate::engine::belief::decision::{decision_to_wire, parse_decision, validate_decision};
use crate::engine::belief::prompt::{build_system_prompt, build_user_prompt};
use crate::engine::belief::similarity::{jaccard, same_slot_value};
use crate::engine::config::BeliefConfig;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::sync::Arc;

/// A decision plus the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub decision: Decision,
    pub source: ResolutionSource,
}

#[async_trait]
pub trait DecisionResolver: Send + Sync {
    /// Decide what to do with `candidate` given the conflicting facts.
    /// The returned decision is not yet validated against the store.
    async fn resolve(&self, candidate: &FactCandidate, conflicts: &[Fact]) -> EngineResult<Resolution>;

    fn name(&self) -> &str;
}

/// Pick the resolution strategy for a configuration.
pub fn build_resolver(
    config: &BeliefConfig,
    reasoner: Option<Arc<dyn Reasoner>>,
) -> Arc<dyn DecisionResolver> {
    match reasoner {
        Some(reasoner) => {
            info!("[belief:resolver] Using reasoner '{}' (fallback={})", reasoner.name(), config.fallback_enabled);
            Arc::new(ReasonerResolver::new(reasoner, config.clone()))
        }
        None => {
            info!("[belief:resolver] Using deterministic heuristic");
            Arc::new(HeuristicResolver)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Heuristic
// ═══════════════════════════════════════════════════════════════════════════

/// Deterministic fallback.
///
/// Policy against the most similar candidate (Jaccard over lowercase word
/// sets, restricted to candidates sharing the subject when one is given):
///
/// | similarity     | action                                          |
/// |----------------|-------------------------------------------------|
/// | > 0.8          | UPDATE if new confidence is higher, else NONE   |
/// | (0.5, 0.8]     | SUPERSEDE                                       |
/// | ≤ 0.5          | ADD                                             |
///
/// Equal similarity is broken by most recent `updated_at`, then higher
/// version, then smallest id.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicResolver;

impl HeuristicResolver {
    pub fn decide(&self, candidate: &FactCandidate, conflicts: &[Fact]) -> Decision {
        if conflicts.is_empty() {
            return Decision::add(NO_CONFLICTS_REASON, 100);
        }

        let pool: Vec<&Fact> = match candidate.subject.as_deref() {
            Some(subject) => conflicts
                .iter()
                .filter(|f| same_slot_value(Some(subject), f.subject.as_deref()))
                .collect(),
            None => conflicts.iter().collect(),
        };

        let best = pool
            .into_iter()
            .map(|f| (jaccard(&candidate.fact, &f.fact), f))
            .max_by(|(sa, a), (sb, b)| {
                sa.partial_cmp(sb)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.updated_at.cmp(&b.updated_at))
                    .then_with(|| a.version.cmp(&b.version))
                    .then_with(|| b.id.cmp(&a.id))
            });

        let Some((similarity, best)) = best else {
            return Decision::add("No existing fact shares the subject", 100);
        };

        let score = (similarity * 100.0).round() as i64;
        debug!(
            "[belief:resolver] Heuristic best={} similarity={:.3}",
            best.id, similarity
        );

        if similarity > SAME_BELIEF_THRESHOLD {
            if candidate.confidence > best.confidence as i64 {
                Decision::update(
                    best.id.clone(),
                    candidate.fact.clone(),
                    format!(
                        "Same belief with higher confidence ({} > {})",
                        candidate.confidence, best.confidence
                    ),
                    score,
                )
            } else {
                Decision::none(
                    Some(best.id.clone()),
                    format!(
                        "Already known with confidence {} >= {}",
                        best.confidence, candidate.confidence
                    ),
                    score,
                )
            }
        } else if similarity > RELATED_BELIEF_THRESHOLD {
            Decision::supersede(
                best.id.clone(),
                format!("Competing version of the belief (similarity {:.2})", similarity),
                score,
            )
        } else {
            Decision::add(
                format!("Distinct from closest fact (similarity {:.2})", similarity),
                ((1.0 - similarity) * 100.0).round() as i64,
            )
        }
    }
}

#[async_trait]
impl DecisionResolver for HeuristicResolver {
    async fn resolve(&self, candidate: &FactCandidate, conflicts: &[Fact]) -> EngineResult<Resolution> {
        Ok(Resolution {
            decision: self.decide(candidate, conflicts),
            source: ResolutionSource::Heuristic,
        })
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Reasoner-backed
// ═══════════════════════════════════════════════════════════════════════════

pub struct ReasonerResolver {
    reasoner: Arc<dyn Reasoner>,
    config: BeliefConfig,
    system_prompt: String,
    heuristic: HeuristicResolver,
}

impl ReasonerResolver {
    pub fn new(reasoner: Arc<dyn Reasoner>, config: BeliefConfig) -> Self {
        let system_prompt = build_system_prompt(&config);
        Self {
            reasoner,
            config,
            system_prompt,
            heuristic: HeuristicResolver,
        }
    }

    /// One bounded round trip: prompt, call, parse, validate.
    async fn ask(&self, candidate: &FactCandidate, conflicts: &[Fact]) -> EngineResult<Decision> {
        // Only facts shown to the reasoner are valid targets.
        let shown = &conflicts[..conflicts.len().min(self.config.max_prompt_candidates)];
        let request = ReasonerRequest {
            system: self.system_prompt.clone(),
            prompt: build_user_prompt(candidate, shown, &self.config),
        };

        let timeout = self.config.reasoner_timeout();
        let text = tokio::time::timeout(timeout, self.reasoner.complete(&request))
            .await
            .map_err(|_| {
                EngineError::Timeout(format!(
                    "{} did not answer within {}ms",
                    self.reasoner.name(),
                    timeout.as_millis()
                ))
            })??;

        let decision = parse_decision(&text)?;
        let ids: Vec<String> = shown.iter().map(|f| f.id.clone()).collect();
        validate_decision(&decision, &ids)?;
        Ok(decision)
    }
}

#[async_trait]
impl DecisionResolver for ReasonerResolver {
    async fn resolve(&self, candidate: &FactCandidate, conflicts: &[Fact]) -> EngineResult<Resolution> {
        if conflicts.is_empty() {
            return Ok(Resolution {
                decision: self.heuristic.decide(candidate, conflicts),
                source: ResolutionSource::Heuristic,
            });
        }

        match self.ask(candidate, conflicts).await {
            Ok(decision) => {
                debug!("[belief:resolver] Reasoner decided {}", decision_to_wire(&decision));
                Ok(Resolution {
                    decision,
                    source: ResolutionSource::Reasoner,
                })
            }
            Err(e) if self.config.fallback_enabled && e.is_recoverable_by_fallback() => {
                warn!(
                    "[belief:resolver] Reasoner '{}' failed, using heuristic: {}",
                    self.reasoner.name(),
                    e
                );
                Ok(Resolution {
                    decision: self.heuristic.decide(candidate, conflicts),
                    source: ResolutionSource::Fallback,
                })
            }
            Err(e) => Err(EngineError::Resolution(format!(
                "{}: {}",
                self.reasoner.name(),
                e
            ))),
        }
    }

    fn name(&self) -> &str {
        self.reasoner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::belief_types::{timestamp_now, Action, FactType, SourceType};
    use chrono::Duration as ChronoDuration;
    use parking_lot::Mutex;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn fact(id: &str, text: &str, confidence: u8) -> Fact {
        let now = timestamp_now();
        Fact {
            id: id.into(),
            memory_space_id: "s".into(),
            fact: text.into(),
            fact_type: FactType::Preference,
            subject: Some("user".into()),
            predicate: Some("likes".into()),
            object: None,
            confidence,
            source_type: SourceType::Conversation,
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

    fn candidate(text: &str, confidence: i64) -> FactCandidate {
        FactCandidate::new("s", text)
            .with_subject("user")
            .with_confidence(confidence)
    }

    /// Answers with canned text and records the prompts it saw.
    struct ScriptedReasoner {
        reply: EngineResult<String>,
        delay: Option<Duration>,
        seen: Mutex<Vec<ReasonerRequest>>,
    }

    impl ScriptedReasoner {
        fn replying(text: &str) -> Self {
            Self { reply: Ok(text.to_string()), delay: None, seen: Mutex::new(Vec::new()) }
        }
        fn failing() -> Self {
            Self {
                reply: Err(EngineError::provider("scripted", "HTTP 503")),
                delay: None,
                seen: Mutex::new(Vec::new()),
            }
        }
        fn slow(delay: Duration) -> Self {
            Self { reply: Ok("{\"action\":\"ADD\"}".into()), delay: Some(delay), seen: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl Reasoner for ScriptedReasoner {
        async fn complete(&self, request: &ReasonerRequest) -> EngineResult<String> {
            self.seen.lock().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(EngineError::provider("scripted", "HTTP 503")),
            }
        }
        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn test_heuristic_policy_table() {
        let h = HeuristicResolver;
        let existing = vec![fact("f1", "User likes blue", 70)];

        let d = h.decide(&candidate("User likes blue", 90), &existing);
        assert_eq!(d.action, Action::Update);
        assert_eq!(d.merged_fact.as_deref(), Some("User likes blue"));
        assert_eq!(d.confidence, 100);

        let d = h.decide(&candidate("User likes blue", 70), &existing);
        assert_eq!(d.action, Action::None);
        assert_eq!(d.target_fact_id.as_deref(), Some("f1"));

        let existing = vec![fact("f2", "User prefers the color red", 70)];
        let d = h.decide(&candidate("User prefers the color blue now", 90), &existing);
        assert_eq!(d.action, Action::Supersede);
        assert_eq!(d.confidence, 57);

        let existing = vec![fact("f3", "User works at Google", 70)];
        let d = h.decide(&candidate("User enjoys hiking", 90), &existing);
        assert_eq!(d.action, Action::Add);
        assert!(d.target_fact_id.is_none());
        assert_eq!(d.confidence, 83);
    }

    #[test]
    fn test_heuristic_no_conflicts_and_subject_filter() {
        let h = HeuristicResolver;
        let d = h.decide(&candidate("anything", 50), &[]);
        assert_eq!(d, Decision::add("No conflicts found", 100));

        let mut other = fact("f1", "User likes blue", 10);
        other.subject = Some("bob".into());
        let d = h.decide(&candidate("User likes blue", 90), &[other]);
        assert_eq!(d.action, Action::Add);
    }

    #[test]
    fn test_heuristic_tie_break_is_deterministic() {
        let h = HeuristicResolver;
        let mut older = fact("a", "User likes blue", 50);
        older.updated_at = older.updated_at - ChronoDuration::seconds(10);
        let newer = fact("b", "User likes blue", 50);
        let d = h.decide(&candidate("User likes blue", 40), &[older.clone(), newer.clone()]);
        assert_eq!(d.target_fact_id.as_deref(), Some("b"));

        // Same timestamp: smallest id wins regardless of input order.
        let mut twin = newer.clone();
        twin.id = "a2".into();
        let d1 = h.decide(&candidate("User likes blue", 40), &[newer.clone(), twin.clone()]);
        let d2 = h.decide(&candidate("User likes blue", 40), &[twin, newer]);
        assert_eq!(d1.target_fact_id.as_deref(), Some("a2"));
        assert_eq!(d1, d2);
    }

    #[test]
    fn test_heuristic_monotonic_in_confidence() {
        let h = HeuristicResolver;
        let existing = vec![fact("f1", "User likes blue", 60)];
        for confidence in 0..=100 {
            let d = h.decide(&candidate("User likes blue", confidence), &existing);
            let expected = if confidence > 60 { Action::Update } else { Action::None };
            assert_eq!(d.action, expected, "confidence {}", confidence);
        }
    }

    #[tokio::test]
    async fn test_reasoner_decision_used() {
        let reasoner = Arc::new(ScriptedReasoner::replying(
            "Decision: {\"action\":\"SUPERSEDE\",\"targetFactId\":\"f1\",\"reason\":\"moved\",\"confidence\":90}",
        ));
        let resolver = ReasonerResolver::new(reasoner.clone(), BeliefConfig::default());
        let existing = vec![fact("f1", "User lives in Berlin", 70)];
        let r = resolver.resolve(&candidate("User lives in Lisbon", 80), &existing).await.unwrap();
        assert_eq!(r.source, ResolutionSource::Reasoner);
        assert_eq!(r.decision, Decision::supersede("f1", "moved", 90));

        let seen = reasoner.seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].prompt.contains("[f1] User lives in Berlin"));
        assert!(seen[0].system.contains("targetFactId"));
    }

    #[tokio::test]
    async fn test_reasoner_skipped_without_conflicts() {
        let reasoner = Arc::new(ScriptedReasoner::failing());
        let resolver = ReasonerResolver::new(reasoner.clone(), BeliefConfig::default());
        let r = resolver.resolve(&candidate("new", 50), &[]).await.unwrap();
        assert_eq!(r.source, ResolutionSource::Heuristic);
        assert!(reasoner.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_on_bad_output_and_unknown_target() {
        let existing = vec![fact("f1", "User likes blue", 70)];
        for reply in ["no json here", "{\"action\":\"MERGE\"}", "{\"action\":\"UPDATE\",\"targetFactId\":\"ghost\",\"mergedFact\":\"x\"}"] {
            let resolver = ReasonerResolver::new(Arc::new(ScriptedReasoner::replying(reply)), BeliefConfig::default());
            let r = resolver.resolve(&candidate("User likes blue", 90), &existing).await.unwrap();
            assert_eq!(r.source, ResolutionSource::Fallback, "reply {}", reply);
            assert_eq!(r.decision.action, Action::Update);
        }
    }

    #[tokio::test]
    async fn test_fallback_on_provider_error() {
        let resolver = ReasonerResolver::new(Arc::new(ScriptedReasoner::failing()), BeliefConfig::default());
        let existing = vec![fact("f1", "User likes blue", 70)];
        let r = resolver.resolve(&candidate("User likes blue", 50), &existing).await.unwrap();
        assert_eq!(r.source, ResolutionSource::Fallback);
        assert_eq!(r.decision.action, Action::None);
    }

    #[tokio::test]
    async fn test_timeout_routes_to_fallback() {
        let config = BeliefConfig { reasoner_timeout_ms: 20, ..Default::default() };
        let resolver = ReasonerResolver::new(Arc::new(ScriptedReasoner::slow(Duration::from_secs(5))), config);
        let existing = vec![fact("f1", "User likes blue", 70)];
        let r = resolver.resolve(&candidate("User likes blue", 90), &existing).await.unwrap();
        assert_eq!(r.source, ResolutionSource::Fallback);
    }

    #[tokio::test]
    async fn test_fallback_disabled_surfaces_resolution_error() {
        let config = BeliefConfig { fallback_enabled: false, ..Default::default() };
        let resolver = ReasonerResolver::new(Arc::new(ScriptedReasoner::replying("nope")), config);
        let existing = vec![fact("f1", "User likes blue", 70)];
        let err = resolver.resolve(&candidate("User likes blue", 90), &existing).await.unwrap_err();
        match err {
            EngineError::Resolution(msg) => assert!(msg.contains("No JSON object found")),
            other => panic!("expected resolution error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_build_resolver_selects_strategy() {
        let heuristic = build_resolver(&BeliefConfig::default(), None);
        assert_eq!(heuristic.name(), "heuristic");
        let reasoned = build_resolver(&BeliefConfig::default(), Some(Arc::new(ScriptedReasoner::failing())));
        assert_eq!(reasoned.name(), "scripted");
    }
}
