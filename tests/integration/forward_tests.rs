//! Integration tests for the forward loop

use std::sync::mpsc;
use std::thread;

use serde_json::Value;
use tempfile::TempDir;
use tg_forward::audit::AuditLogger;
use tg_forward::{
    ApiResponse, ForwardLoop, ForwardStats, ForwardTarget, MemoryRepository, MessageEvent,
    Normalizer, Rule, RuleDraft, RuleService, WriterForwarder,
};

const BOT_ID: i64 = 777;

fn service() -> RuleService {
    let repo = MemoryRepository::with_rules(vec![
        Rule::with_pattern("p1", "urgent", "urgent"),
        Rule::with_keywords("k1", "server down", ["server", "down"]),
    ])
    .unwrap();
    RuleService::new(repo, Normalizer::default()).unwrap()
}

fn lines(buf: Vec<u8>) -> Vec<Value> {
    String::from_utf8(buf)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn test_stream_forwarding_with_audit() {
    let dir = TempDir::new().unwrap();
    let audit_path = dir.path().join("logs/audit.jsonl");
    let service = service();

    let (tx, rx) = mpsc::channel();
    let producer = thread::spawn(move || {
        let events = [
            MessageEvent::new(-1, "URGENT: disk full").from_sender(5),
            MessageEvent::new(-1, "lunch at noon?").from_sender(5),
            MessageEvent::new(-1, "urgent, from the bot").from_sender(BOT_ID),
            MessageEvent::new(-1, "urgent reply").outgoing(),
            MessageEvent::new(-2, "The Server is DOWN again").from_sender(6),
        ];
        for event in events {
            tx.send(event).unwrap();
        }
    });

    let forwarder = WriterForwarder::new(ForwardTarget::ChatId(-100500), Vec::new());
    let audit = AuditLogger::new(Some(&audit_path));
    assert!(audit.is_enabled());

    producer.join().unwrap();
    let stats = ForwardLoop::new(&service, &forwarder)
        .ignore_sender(Some(BOT_ID))
        .with_audit(audit)
        .run(rx);
    assert_eq!(
        stats,
        ForwardStats {
            received: 5,
            forwarded: 2,
            skipped: 1,
            ignored: 2,
            failed: 0,
        }
    );

    let delivered = lines(forwarder.into_inner());
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0]["target"], "-100500");
    assert_eq!(delivered[1]["text"], "The Server is DOWN again");

    let audit_lines: Vec<Value> = std::fs::read_to_string(&audit_path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let levels: Vec<&str> = audit_lines
        .iter()
        .map(|v| v["level"].as_str().unwrap())
        .collect();
    assert_eq!(
        levels,
        vec!["FORWARDED", "SKIPPED", "IGNORED", "IGNORED", "FORWARDED"]
    );
    assert_eq!(audit_lines[4]["matched"][0], "server, down");
}

#[test]
fn test_run_delivers_in_arrival_order() {
    let service = service();
    let (tx, rx) = mpsc::channel();
    for text in ["urgent one", "nothing", "urgent two", "server is down"] {
        tx.send(MessageEvent::new(-1, text)).unwrap();
    }
    drop(tx);

    let target = ForwardTarget::Username("alerts_channel".into());
    let forwarder = WriterForwarder::new(target, Vec::new());
    let stats = ForwardLoop::new(&service, &forwarder).run(rx);
    assert_eq!(
        stats,
        ForwardStats {
            received: 4,
            forwarded: 3,
            skipped: 1,
            ignored: 0,
            failed: 0,
        }
    );

    let delivered = lines(forwarder.into_inner());
    let texts: Vec<&str> = delivered.iter().map(|v| v["text"].as_str().unwrap()).collect();
    assert_eq!(texts, vec!["urgent one", "urgent two", "server is down"]);
    assert!(delivered.iter().all(|v| v["target"] == "@alerts_channel"));
}

#[test]
fn test_rule_changes_apply_to_next_message() {
    let service = service();
    let forwarder = WriterForwarder::new(ForwardTarget::ChatId(1), Vec::new());
    let mut forward_loop = ForwardLoop::new(&service, &forwarder);

    let event = MessageEvent::new(-1, "Promoção de café hoje");
    assert!(!forward_loop.handle(&event).is_forwarded());

    service
        .add_rule(RuleDraft::keywords("coffee deals", ["promocao", "cafe"]))
        .unwrap();
    assert!(forward_loop.handle(&event).is_forwarded());

    let response: ApiResponse<_> = service.get_rules().into();
    assert!(response.is_success());
}
