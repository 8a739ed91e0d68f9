//! Integration tests for the rule service over a file-backed repository

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;
use tg_forward::{JsonFileRepository, Normalizer, Rule, RuleDraft, RuleRepository, RuleService};

fn file_service(dir: &TempDir, rules: Vec<Rule>) -> RuleService {
    let repo = JsonFileRepository::open(dir.path().join("rules.json")).unwrap();
    if !rules.is_empty() {
        repo.replace_all(rules).unwrap();
    }
    RuleService::new(repo, Normalizer::default()).unwrap()
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[test]
fn test_pattern_and_keyword_scenario() {
    let dir = TempDir::new().unwrap();
    let service = file_service(
        &dir,
        vec![
            Rule::with_pattern("", "urgent", "urgent"),
            Rule::with_keywords("", "critical now", ["critical", "now"]),
        ],
    );

    let matcher = service.current_matcher();
    assert!(matcher.is_match("This is critical right now"));
    assert_eq!(
        matcher.find_matches("This is critical right now"),
        vec!["critical, now".to_string()]
    );
    assert!(!matcher.is_match("nothing special"));
}

#[test]
fn test_keyword_conjunction() {
    let dir = TempDir::new().unwrap();
    let service = file_service(&dir, vec![]);
    service
        .add_rule(RuleDraft::keywords("urgent alert", ["urgent", "alert"]))
        .unwrap();

    let matcher = service.current_matcher();
    assert!(matcher.is_match("This is an URGENT alert!"));
    assert!(!matcher.is_match("This is urgent"));
}

#[test]
fn test_mutations_survive_restart() {
    let dir = TempDir::new().unwrap();
    let added = {
        let service = file_service(&dir, vec![]);
        let a = service.add_rule(RuleDraft::pattern("deploys", "deploy(ed)?")).unwrap();
        let b = service.add_rule(RuleDraft::keywords("outage", ["server", "down"])).unwrap();
        service.remove_rule(&a.id).unwrap();
        b
    };

    let service = file_service(&dir, vec![]);
    assert_eq!(service.get_rules().unwrap(), vec![added]);
    assert!(service.current_matcher().is_match("Server went DOWN"));
    assert!(!service.current_matcher().is_match("deployed"));
}

#[test]
fn test_rejected_update_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let service = file_service(&dir, vec![Rule::with_pattern("r1", "urgent", "urgent")]);
    let path = dir.path().join("rules.json");
    let before = std::fs::read_to_string(&path).unwrap();

    assert!(service.update_rules(vec![]).unwrap_err().is_validation());
    assert!(service
        .update_rules(vec![Rule::with_pattern("", "bad", "[unclosed")])
        .unwrap_err()
        .is_validation());

    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    assert!(service.current_matcher().is_match("urgent"));
}

#[test]
fn test_remove_missing_id_keeps_same_matcher() {
    let dir = TempDir::new().unwrap();
    let service = file_service(&dir, vec![Rule::with_pattern("r1", "urgent", "urgent")]);
    let before = service.current_matcher();

    assert!(service.remove_rule("missing-id").unwrap_err().is_not_found());
    assert!(Arc::ptr_eq(&before, &service.current_matcher()));
}

#[test]
fn test_accent_sensitivity_is_configurable() {
    let dir = TempDir::new().unwrap();
    let repo = JsonFileRepository::open(dir.path().join("rules.json")).unwrap();
    repo.replace_all(vec![Rule::with_keywords("", "cafe", ["cafe"])])
        .unwrap();

    let literal = RuleService::new(repo, Normalizer::new(false)).unwrap();
    assert!(!literal.current_matcher().is_match("Café aberto"));

    let repo = JsonFileRepository::open(dir.path().join("rules.json")).unwrap();
    let folded = RuleService::new(repo, Normalizer::new(true)).unwrap();
    assert!(folded.current_matcher().is_match("Café aberto"));
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[test]
fn test_readers_see_whole_snapshots_during_updates() {
    let dir = TempDir::new().unwrap();
    let old_rules = vec![
        Rule::with_pattern("", "alpha", "alpha"),
        Rule::with_keywords("", "beta", ["beta"]),
    ];
    let new_rules = vec![
        Rule::with_pattern("", "gamma", "gamma"),
        Rule::with_keywords("", "delta", ["delta"]),
    ];
    let service = Arc::new(file_service(&dir, old_rules.clone()));

    let text = "alpha beta gamma delta";
    let old_view = vec!["alpha".to_string(), "beta".to_string()];
    let new_view = vec!["gamma".to_string(), "delta".to_string()];

    let readers = 8;
    let barrier = Arc::new(Barrier::new(readers + 1));
    let done = Arc::new(AtomicBool::new(false));

    let handles: Vec<_> = (0..readers)
        .map(|_| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            let done = Arc::clone(&done);
            let (old_view, new_view) = (old_view.clone(), new_view.clone());
            thread::spawn(move || {
                barrier.wait();
                let mut observed = 0u64;
                while !done.load(Ordering::SeqCst) || observed == 0 {
                    let found = service.current_matcher().find_matches(text);
                    assert!(
                        found == old_view || found == new_view,
                        "mixed snapshot observed: {:?}",
                        found
                    );
                    observed += 1;
                }
                observed
            })
        })
        .collect();

    barrier.wait();
    for i in 0..20 {
        let rules = if i % 2 == 0 { new_rules.clone() } else { old_rules.clone() };
        service.update_rules(rules).unwrap();
    }
    done.store(true, Ordering::SeqCst);

    for handle in handles {
        assert!(handle.join().unwrap() > 0);
    }
    // Last update (i = 19) restored the old rules
    assert_eq!(service.current_matcher().find_matches(text), old_view);
}

#[test]
fn test_concurrent_adds_all_persisted() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(file_service(&dir, vec![]));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                service
                    .add_rule(RuleDraft::pattern(format!("rule {}", i), format!("token{}", i)))
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(service.get_rules().unwrap().len(), 8);
    let matcher = service.current_matcher();
    assert_eq!(matcher.len(), 8);
    for i in 0..8 {
        assert!(matcher.is_match(&format!("saw token{} today", i)));
    }
}
