use std::{
    collections::HashMap,
    net::Ipv4Addr,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use modguard::{
    checkers::{AllowList, Checker, ManualChecker as _},
    config::FilterConfig,
    domain::{CheckContext, CheckResult, Embed, InboundMessage, MessageRef},
    net::{HostResolver, ListFetcher},
    pipeline::CheckerRegistry,
    Decision, FilterEngine, MemoryStore,
};

struct StubResolver {
    answers: HashMap<String, Vec<Ipv4Addr>>,
}

impl StubResolver {
    fn new(answers: &[(&str, Ipv4Addr)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(host, addr)| (host.to_string(), vec![*addr]))
                .collect(),
        }
    }
}

#[async_trait]
impl HostResolver for StubResolver {
    async fn resolve_ipv4(&self, host: &str) -> anyhow::Result<Vec<Ipv4Addr>> {
        self.answers
            .get(host)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such host: {host}"))
    }
}

struct StubFetcher {
    body: Vec<u8>,
}

#[async_trait]
impl ListFetcher for StubFetcher {
    async fn get(&self, _url: &str) -> anyhow::Result<Vec<u8>> {
        Ok(self.body.clone())
    }
}

fn sha256_hex(host: &str) -> String {
    format!("{:x}", Sha256::digest(host.as_bytes()))
}

fn message(text: &str) -> InboundMessage {
    InboundMessage {
        author_id: 42,
        author_display: "offender".to_string(),
        message: MessageRef {
            channel_id: 5,
            message_id: 100,
        },
        content: text.to_string(),
        embeds: Vec::new(),
        snapshots: Vec::new(),
        timestamp: Utc::now(),
    }
}

fn engine(resolver: StubResolver) -> FilterEngine {
    FilterEngine::new(
        &FilterConfig::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(resolver),
    )
    .unwrap()
}

#[tokio::test]
async fn clean_message_is_allowed() {
    let engine = engine(StubResolver::new(&[]));
    let decision = engine.evaluate_message(&message("hello world")).await;
    assert_eq!(decision, Decision::Allow);
}

#[tokio::test]
async fn bad_domain_blocks_end_to_end() {
    let engine = engine(StubResolver::new(&[]));
    let fetcher = StubFetcher {
        body: serde_json::to_vec(&[sha256_hex("bad.example")]).unwrap(),
    };
    engine
        .registry()
        .update_checker("bad_domains", &fetcher)
        .await
        .unwrap();

    let msg = message("check out http://bad.example/x");
    match engine.evaluate_message(&msg).await {
        Decision::Block { reason, messages } => {
            assert!(reason.contains("bad-domains hash"));
            assert!(reason.contains("bad.example"));
            assert_eq!(messages, vec![msg.message]);
        }
        Decision::Allow => panic!("expected block"),
    }
}

#[tokio::test]
async fn allowlisted_host_vetoes_host_based_match() {
    let engine = engine(StubResolver::new(&[]));
    let fetcher = StubFetcher {
        body: serde_json::to_vec(&[sha256_hex("good.example")]).unwrap(),
    };
    engine
        .registry()
        .update_checker("bad_domains", &fetcher)
        .await
        .unwrap();
    engine
        .registry()
        .entry_add("allowed_hosts", "good.example")
        .unwrap();

    let decision = engine
        .evaluate_message(&message("see http://good.example/page"))
        .await;
    assert_eq!(decision, Decision::Allow);
}

#[tokio::test]
async fn veto_suppresses_one_checker_not_the_message() {
    // host A: flagged by bad_domains but allow-listed
    // host B: resolves into a blocked network
    let engine = engine(StubResolver::new(&[(
        "evil.example",
        Ipv4Addr::new(203, 0, 113, 5),
    )]));
    let fetcher = StubFetcher {
        body: serde_json::to_vec(&[sha256_hex("good.example")]).unwrap(),
    };
    engine
        .registry()
        .update_checker("bad_domains", &fetcher)
        .await
        .unwrap();
    engine
        .registry()
        .entry_add("allowed_hosts", "good.example")
        .unwrap();
    engine
        .registry()
        .entry_add("ips", "203.0.113.0/24")
        .unwrap();

    let msg = message("http://good.example/a and http://evil.example/b");
    match engine.evaluate_message(&msg).await {
        Decision::Block { reason, .. } => {
            assert!(reason.contains("evil.example"), "reason: {reason}");
        }
        Decision::Allow => panic!("expected the IP checker to block"),
    }
}

#[tokio::test]
async fn plain_string_match_cannot_be_vetoed() {
    let engine = engine(StubResolver::new(&[]));
    engine
        .registry()
        .entry_add("strings", "badword")
        .unwrap();
    // allow-listing the literal text has no effect on non-host matches
    engine
        .registry()
        .entry_add("allowed_hosts", "badword")
        .unwrap();

    assert!(engine
        .evaluate_message(&message("contains badword here"))
        .await
        .is_block());
}

#[tokio::test]
async fn checkers_run_in_registration_order() {
    let engine = engine(StubResolver::new(&[]));
    engine.registry().entry_add("strings", "spam").unwrap();
    engine.registry().entry_add("regex", "sp.m").unwrap();

    match engine.evaluate_message(&message("spam text")).await {
        Decision::Block { reason, .. } => {
            // the plain string list runs before the regex list
            assert_eq!(reason, "filtered string: `spam`");
        }
        Decision::Allow => panic!("expected block"),
    }
}

#[tokio::test]
async fn spam_match_reports_all_offending_messages() {
    let engine = engine(StubResolver::new(&[]));
    engine
        .registry()
        .entry_add("spam_regex", "free nitro")
        .unwrap();

    let mut first = message("claim your free nitro");
    first.message.message_id = 1;
    let mut second = message("claim your free nitro");
    second.message.message_id = 2;

    assert_eq!(engine.evaluate_message(&first).await, Decision::Allow);
    match engine.evaluate_message(&second).await {
        Decision::Block { reason, messages } => {
            assert!(reason.contains("detected spam"));
            let ids: Vec<i64> = messages.iter().map(|m| m.message_id).collect();
            assert_eq!(ids, vec![2, 1]);
        }
        Decision::Allow => panic!("expected spam block"),
    }
}

#[tokio::test]
async fn snapshot_content_is_evaluated_independently() {
    let engine = engine(StubResolver::new(&[]));
    engine.registry().entry_add("strings", "badword").unwrap();

    let mut msg = message("clean primary content");
    msg.snapshots.push(modguard::domain::SnapshotContent {
        content: "forwarded badword".to_string(),
        embeds: Vec::new(),
    });
    assert!(engine.evaluate_message(&msg).await.is_block());
}

#[tokio::test]
async fn embed_text_is_part_of_the_checked_content() {
    let engine = engine(StubResolver::new(&[]));
    engine.registry().entry_add("strings", "badword").unwrap();

    let mut msg = message("clean content");
    msg.embeds.push(Embed {
        title: None,
        description: Some("embedded badword".to_string()),
        fields: Vec::new(),
    });
    assert!(engine.evaluate_message(&msg).await.is_block());
}

#[tokio::test]
async fn slow_checker_times_out_and_later_checkers_still_run() {
    struct SlowChecker;

    #[async_trait]
    impl Checker for SlowChecker {
        async fn check(&self, _ctx: &CheckContext) -> Option<CheckResult> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Some(CheckResult::new("should never be reached"))
        }

        fn len(&self) -> usize {
            0
        }

        fn contains(&self, _value: &str) -> bool {
            false
        }

        fn entries(&self) -> Vec<String> {
            Vec::new()
        }
    }

    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let allowlist = Arc::new(AllowList::load(store.clone(), "allowlist.json").unwrap());
    let mut registry = CheckerRegistry::new();
    registry.register(
        "slow",
        Arc::new(SlowChecker) as Arc<dyn Checker>,
    );
    let strings = Arc::new(
        modguard::checkers::ListChecker::load(store, "blocklist.json").unwrap(),
    );
    strings.entry_add("badword").unwrap();
    registry.register_manual("strings", strings);

    let engine = FilterEngine::with_registry(registry, allowlist, Duration::from_millis(50));
    let decision = engine.evaluate_message(&message("has badword")).await;
    assert!(decision.is_block(), "timeout must not block later checkers");
}

#[tokio::test]
async fn unknown_checker_name_is_an_error() {
    let engine = engine(StubResolver::new(&[]));
    assert!(engine.registry().entry_add("nope", "x").is_err());
    // bad_domains is externally sourced, not manually curated
    assert!(engine.registry().entry_add("bad_domains", "x").is_err());
}

#[tokio::test]
async fn admin_surface_lists_entries_per_checker() {
    let engine = engine(StubResolver::new(&[]));
    engine.registry().entry_add("strings", "a").unwrap();
    engine.registry().entry_add("strings", "b").unwrap();
    assert_eq!(
        engine.registry().entries("strings").unwrap(),
        vec!["a".to_string(), "b".to_string()]
    );
    let names: Vec<&str> = engine.registry().names().collect();
    assert_eq!(
        names,
        vec![
            "allowed_hosts",
            "strings",
            "regex",
            "bad_domains",
            "spam_regex",
            "ips"
        ]
    );
}
