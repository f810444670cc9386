// ── Engram Belief: end-to-end scenarios ────────────────────────────────────
// Full pipeline against in-memory SQLite stores.

use async_trait::async_trait;
use engram_belief::{
    decision_to_wire, parse_decision, Action, BeliefConfig, BeliefEngine, BeliefStore, Decision,
    EngineError, EngineResult, FactCandidate, FactFilter, FactStore, FactType, HistoryAction,
    Reasoner, ReasonerRequest, ResolutionSource,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const SPACE: &str = "space-1";

fn engine() -> BeliefEngine {
    BeliefEngine::in_memory(BeliefConfig::default()).unwrap()
}

fn about_user(text: &str, confidence: i64) -> FactCandidate {
    FactCandidate::new(SPACE, text)
        .with_type(FactType::Preference)
        .with_subject("user")
        .with_confidence(confidence)
}

// ═══════════════════════════════════════════════════════════════════════════
// Heuristic scenarios
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn scenario_a_higher_confidence_updates() {
    let engine = engine();
    let existing = engine.store_fact(&about_user("User likes blue", 70)).unwrap();

    let outcome = engine.revise(&about_user("User likes blue", 90)).await.unwrap();
    assert_eq!(outcome.action, Action::Update);
    assert_eq!(outcome.decision.target_fact_id.as_deref(), Some(existing.id.as_str()));

    let v2 = outcome.fact.unwrap();
    assert_eq!(v2.version, 2);
    assert_eq!(v2.confidence, 90);
    assert_eq!(v2.supersedes.as_deref(), Some(existing.id.as_str()));
}

#[tokio::test]
async fn scenario_b_lower_confidence_is_none() {
    let engine = engine();
    let existing = engine.store_fact(&about_user("User likes blue", 90)).unwrap();

    let outcome = engine.revise(&about_user("User likes blue", 70)).await.unwrap();
    assert_eq!(outcome.action, Action::None);
    assert_eq!(outcome.decision.target_fact_id.as_deref(), Some(existing.id.as_str()));
    assert_eq!(engine.get_fact(SPACE, &existing.id).unwrap().unwrap(), existing);
}

#[tokio::test]
async fn scenario_c_competing_version_supersedes() {
    let engine = engine();
    let existing = engine
        .store_fact(&about_user("User prefers the color red", 80))
        .unwrap();

    let outcome = engine
        .revise(&about_user("User prefers the color blue now", 80))
        .await
        .unwrap();
    assert_eq!(outcome.action, Action::Supersede);
    assert_eq!(outcome.decision.target_fact_id.as_deref(), Some(existing.id.as_str()));
    assert_eq!(outcome.fact.unwrap().fact, "User prefers the color blue now");

    let old = engine.get_fact(SPACE, &existing.id).unwrap().unwrap();
    assert!(!old.is_active());
    assert!(old.valid_until.is_some());
}

#[tokio::test]
async fn scenario_d_unrelated_fact_is_added() {
    let engine = engine();
    let existing = engine.store_fact(&about_user("User works at Google", 80)).unwrap();

    let outcome = engine.revise(&about_user("User enjoys hiking", 80)).await.unwrap();
    assert_eq!(outcome.action, Action::Add);
    assert!(outcome.decision.target_fact_id.is_none());
    let added = outcome.fact.unwrap();
    assert_eq!(added.version, 1);
    assert_ne!(added.id, existing.id);
    assert!(engine.get_fact(SPACE, &existing.id).unwrap().unwrap().is_active());
}

#[test]
fn scenario_e_consolidate_into_survivor() {
    let engine = engine();
    let f1 = engine.store_fact(&about_user("User likes blue", 60)).unwrap();
    let f2 = engine.store_fact(&about_user("User likes blue a lot", 85)).unwrap();
    let f3 = engine.store_fact(&about_user("User likes the color blue", 70)).unwrap();

    let ids = vec![f1.id.clone(), f2.id.clone(), f3.id.clone()];
    let report = engine.consolidate(SPACE, &ids, &f3.id, None).unwrap();
    assert!(report.consolidated);
    assert_eq!(report.kept_fact_id, f3.id);
    assert_eq!(report.merged_count, 2);

    let f1 = engine.get_fact(SPACE, &f1.id).unwrap().unwrap();
    let f2 = engine.get_fact(SPACE, &f2.id).unwrap().unwrap();
    let kept = engine.get_fact(SPACE, &f3.id).unwrap().unwrap();
    assert_eq!(f1.superseded_by.as_deref(), Some(f3.id.as_str()));
    assert_eq!(f2.superseded_by.as_deref(), Some(f3.id.as_str()));
    assert_eq!(kept.version, f3.version);
    assert_eq!(kept.fact, f3.fact);
    assert_eq!(kept.confidence, 85);
    assert!(kept.confidence >= f3.confidence);
}

// ═══════════════════════════════════════════════════════════════════════════
// Chain properties
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn chain_integrity_after_sequential_revisions() {
    let engine = engine();
    let root = engine
        .revise(&about_user("User prefers the color red", 10))
        .await
        .unwrap()
        .fact
        .unwrap();

    // Each new color competes with the tip (SUPERSEDE), then a restatement
    // at higher confidence refines it (UPDATE).
    let colors = ["blue", "green", "yellow"];
    let mut expected = vec![HistoryAction::Add];
    let mut tip = root.clone();
    let mut confidence = 10;
    for color in colors {
        let text = format!("User prefers the color {}", color);
        for action in [Action::Supersede, Action::Update] {
            confidence += 10;
            let outcome = engine.revise(&about_user(&text, confidence)).await.unwrap();
            assert_eq!(outcome.action, action, "{} at {}", text, confidence);
            assert_eq!(outcome.decision.target_fact_id.as_deref(), Some(tip.id.as_str()));
            assert!(outcome.history_error.is_none());
            tip = outcome.fact.unwrap();
            expected.push(action.into());
        }
    }
    let n = colors.len() * 2;
    assert_eq!(tip.version as usize, n + 1);
    assert_eq!(tip.fact, "User prefers the color yellow");

    let history = engine.get_history(SPACE, &tip.id).unwrap();
    assert_eq!(history.iter().map(|e| e.action).collect::<Vec<_>>(), expected);
    assert_eq!(engine.get_history(SPACE, &root.id).unwrap(), history);

    // Exactly one active version in the lineage.
    let lineage = engine.get_lineage(SPACE, &root.id).unwrap();
    assert_eq!(lineage.len(), n + 1);
    assert_eq!(lineage.iter().filter(|f| f.is_active()).count(), 1);

    // Walking supersedes from the tip visits every version once, ending at the root.
    let mut seen = HashSet::new();
    let mut cursor = Some(tip.clone());
    while let Some(fact) = cursor {
        assert!(seen.insert(fact.id.clone()));
        cursor = fact
            .supersedes
            .as_deref()
            .map(|id| engine.get_fact(SPACE, id).unwrap().unwrap());
        if cursor.is_none() {
            assert_eq!(fact.id, root.id);
        }
    }
    assert_eq!(seen.len(), n + 1);

    for (i, fact) in lineage.iter().enumerate() {
        assert_eq!(fact.version as usize, i + 1);
        assert_eq!(fact.valid_until.is_some(), fact.superseded_by.is_some());
    }
    assert!(engine.audit_chains(SPACE).unwrap().is_empty());
}

#[tokio::test]
async fn bidirectional_links_across_revise_paths() {
    let engine = engine();
    engine.revise(&about_user("User prefers the color red", 60)).await.unwrap();
    engine.revise(&about_user("User prefers the color blue now", 70)).await.unwrap();
    engine.revise(&about_user("User prefers the color blue now", 90)).await.unwrap();
    engine.revise(&about_user("User enjoys hiking on weekends", 50)).await.unwrap();

    let all = engine.list_facts(SPACE, &FactFilter::all_versions()).unwrap();
    for a in &all {
        for b in &all {
            let forward = a.superseded_by.as_deref() == Some(b.id.as_str());
            let backward = b.supersedes.as_deref() == Some(a.id.as_str());
            assert_eq!(forward, backward, "{} / {}", a.id, b.id);
        }
    }
    assert!(engine.audit_chains(SPACE).unwrap().is_empty());
}

#[tokio::test]
async fn none_leaves_target_untouched() {
    let engine = engine();
    let target = engine.store_fact(&about_user("User likes blue", 95)).unwrap();
    let before_history = engine.get_history(SPACE, &target.id).unwrap().len();

    let outcome = engine.revise(&about_user("user likes BLUE", 10)).await.unwrap();
    assert_eq!(outcome.action, Action::None);

    let after = engine.get_fact(SPACE, &target.id).unwrap().unwrap();
    assert_eq!(after.version, target.version);
    assert_eq!(after.fact, target.fact);
    assert_eq!(after.supersedes, target.supersedes);
    assert_eq!(after.superseded_by, target.superseded_by);

    let history = engine.get_history(SPACE, &target.id).unwrap();
    assert_eq!(history.len(), before_history + 1);
    assert_eq!(history.last().map(|e| e.action), Some(HistoryAction::None));
}

#[tokio::test]
async fn heuristic_monotonic_in_candidate_confidence() {
    for confidence in [0, 30, 59, 60, 61, 80, 100] {
        let engine = engine();
        engine.store_fact(&about_user("User likes blue", 60)).unwrap();
        let outcome = engine
            .revise(&about_user("User likes blue", confidence))
            .await
            .unwrap();
        let expected = if confidence > 60 { Action::Update } else { Action::None };
        assert_eq!(outcome.action, expected, "confidence {}", confidence);
    }
}

#[test]
fn decision_wire_roundtrip() {
    let cases = [
        Decision::add("fresh", 90),
        Decision::update("f1", "merged", "refines", 70),
        Decision::supersede("f2", "replaces", 65),
        Decision::none(Some("f3".into()), "known", 99),
        Decision::none(None, "nothing", 75),
        Decision {
            action: Action::Add,
            target_fact_id: None,
            reason: "with merge text".into(),
            merged_fact: Some("ignored".into()),
            confidence: 1,
        },
    ];
    for decision in cases {
        assert_eq!(parse_decision(&decision_to_wire(&decision)).unwrap(), decision);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Isolation & history
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn history_and_chain_are_space_scoped() {
    let engine = engine();
    let fact = engine.store_fact(&about_user("User likes blue", 50)).unwrap();
    assert!(engine.get_history("other-space", &fact.id).unwrap().is_empty());
    assert!(engine.get_history(SPACE, "missing").unwrap().is_empty());
    assert!(engine.get_supersession_chain("other-space", &fact.id).unwrap().is_empty());

    let intruder = engine
        .store_fact(&FactCandidate::new("other-space", "Unrelated"))
        .unwrap();
    let err = engine
        .consolidate("other-space", &[fact.id.clone()], &intruder.id, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied { .. }));
}

#[test]
fn file_store_survives_reopen() {
    let path = std::env::temp_dir().join(format!("engram-belief-{}.db", uuid::Uuid::new_v4()));
    let id = {
        let store = Arc::new(BeliefStore::open(&path).unwrap());
        let engine = BeliefEngine::new(store, BeliefConfig::default()).unwrap();
        engine.store_fact(&about_user("User likes blue", 50)).unwrap().id
    };
    let store = BeliefStore::open(&path).unwrap();
    let fact = store.get(SPACE, &id).unwrap().unwrap();
    assert_eq!(fact.fact, "User likes blue");
    drop(store);
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Reasoner-backed resolution
// ═══════════════════════════════════════════════════════════════════════════

struct StubReasoner {
    reply: String,
    delay: Duration,
}

#[async_trait]
impl Reasoner for StubReasoner {
    async fn complete(&self, _request: &ReasonerRequest) -> EngineResult<String> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

fn reasoned_engine(reply: &str, delay: Duration, config: BeliefConfig) -> BeliefEngine {
    let store = Arc::new(BeliefStore::open_in_memory().unwrap());
    let reasoner = Arc::new(StubReasoner { reply: reply.to_string(), delay });
    BeliefEngine::with_reasoner(store, config, reasoner).unwrap()
}

#[tokio::test]
async fn reasoner_supersede_is_applied() {
    let store = Arc::new(BeliefStore::open_in_memory().unwrap());
    let seeding = BeliefEngine::new(store.clone(), BeliefConfig::default()).unwrap();
    let target = seeding.store_fact(&about_user("User lives in Berlin", 70)).unwrap();

    let reply = format!(
        "After review: {{\"action\": \"SUPERSEDE\", \"targetFactId\": \"{}\", \"reason\": \"relocated\", \"mergedFact\": null, \"confidence\": 92}}",
        target.id
    );
    let reasoner = Arc::new(StubReasoner { reply, delay: Duration::ZERO });
    let engine = BeliefEngine::with_reasoner(store, BeliefConfig::default(), reasoner).unwrap();
    assert_eq!(engine.resolver_name(), "stub");

    let outcome = engine.revise(&about_user("User lives in Lisbon now", 80)).await.unwrap();
    assert_eq!(outcome.resolved_by, ResolutionSource::Reasoner);
    assert_eq!(outcome.action, Action::Supersede);
    assert_eq!(outcome.decision.confidence, 92);

    let successor = outcome.fact.unwrap();
    assert_eq!(successor.supersedes.as_deref(), Some(target.id.as_str()));
    assert_eq!(successor.version, 2);
    assert!(!engine.get_fact(SPACE, &target.id).unwrap().unwrap().is_active());

    let history = engine.get_history(SPACE, &successor.id).unwrap();
    assert_eq!(history.last().map(|e| e.reason.as_str()), Some("relocated"));
}

#[tokio::test]
async fn reasoner_timeout_falls_back_to_heuristic() {
    let config = BeliefConfig { reasoner_timeout_ms: 25, ..Default::default() };
    let engine = reasoned_engine("{\"action\":\"ADD\"}", Duration::from_secs(5), config);
    engine.store_fact(&about_user("User likes blue", 60)).unwrap();

    let outcome = engine.revise(&about_user("User likes blue", 90)).await.unwrap();
    assert_eq!(outcome.resolved_by, ResolutionSource::Fallback);
    assert_eq!(outcome.action, Action::Update);
}

#[tokio::test]
async fn reasoner_failure_without_fallback_surfaces() {
    let config = BeliefConfig { fallback_enabled: false, ..Default::default() };
    let engine = reasoned_engine("I cannot decide.", Duration::ZERO, config);
    let existing = engine.store_fact(&about_user("User likes blue", 60)).unwrap();

    let err = engine.revise(&about_user("User likes blue", 90)).await.unwrap_err();
    assert!(matches!(err, EngineError::Resolution(_)));
    assert!(engine.get_fact(SPACE, &existing.id).unwrap().unwrap().is_active());
}
