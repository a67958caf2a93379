use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};

use crate::{
    checkers::{regex::PatternSet, AddOutcome, Checker, ManualChecker, RemoveOutcome},
    config::SpamConfig,
    domain::{CheckContext, CheckResult, MessageRef},
    storage::{ListStore, StoreError},
};

struct HistoryEntry {
    message: MessageRef,
    created_at: DateTime<Utc>,
}

struct SpamState {
    /// (author id, exact message text) -> prior occurrences, in arrival
    /// order. Process-lifetime only; a rate-limit signal, not a ban list.
    history: HashMap<(i64, String), Vec<HistoryEntry>>,
    last_cleanup: DateTime<Utc>,
}

/// Detects repetition of regex-triggering content: once the same author
/// sends the same exact text often enough within the configured window,
/// the match reports every occurrence for bulk remediation.
pub struct SpamChecker {
    patterns: RwLock<PatternSet>,
    state: Mutex<SpamState>,
    config: SpamConfig,
}

impl SpamChecker {
    pub fn load(store: Arc<dyn ListStore>, key: &str, config: SpamConfig) -> anyhow::Result<Self> {
        Ok(Self {
            patterns: RwLock::new(PatternSet::load(store, key)?),
            state: Mutex::new(SpamState {
                history: HashMap::new(),
                last_cleanup: Utc::now(),
            }),
            config,
        })
    }
}

/// Entries are appended in arrival order, so eviction is a prefix trim.
fn trim_expired(history: &mut Vec<HistoryEntry>, min_time: DateTime<Utc>) -> usize {
    let keep_from = history
        .iter()
        .position(|entry| entry.created_at >= min_time)
        .unwrap_or(history.len());
    history.drain(..keep_from);
    keep_from
}

#[async_trait]
impl Checker for SpamChecker {
    async fn check(&self, ctx: &CheckContext) -> Option<CheckResult> {
        let created = ctx.timestamp;
        let min_spam_time = created - Duration::seconds(self.config.interval_secs as i64);

        let mut state = self.state.lock();

        // Full scans over every bucket are bounded to once per 5 seconds
        // of message time, keeping the hot path cheap.
        if state.last_cleanup < created - Duration::seconds(5) {
            let mut dropped = 0;
            state.history.retain(|_, history| {
                dropped += trim_expired(history, min_spam_time);
                !history.is_empty()
            });
            if dropped > 0 {
                tracing::debug!(target: "filter", dropped, "cleaned spam history entries");
            }
            state.last_cleanup = created;
        }

        // Only the first matching pattern counts; spam classification is
        // based on the message content, not on which regex matched.
        let (pattern, matched) = self.patterns.read().find_first(&ctx.text)?;

        let history = state
            .history
            .entry((ctx.author_id, ctx.text.clone()))
            .or_default();
        tracing::debug!(
            target: "filter",
            author = %ctx.author_display,
            author_id = ctx.author_id,
            previous = history.len(),
            "detected potential spam"
        );

        history.push(HistoryEntry {
            message: ctx.message,
            created_at: created,
        });
        trim_expired(history, min_spam_time);

        if history.len() >= self.config.repeat_count {
            // newest first, so the caller can batch-delete without
            // duplicating the triggering message
            let messages: Vec<MessageRef> =
                history.iter().rev().map(|entry| entry.message).collect();
            return Some(
                CheckResult::new(format!("detected spam: `{matched}` (regex: `{pattern}`)"))
                    .with_messages(messages),
            );
        }
        None
    }

    fn len(&self) -> usize {
        self.patterns.read().len()
    }

    fn contains(&self, value: &str) -> bool {
        self.patterns.read().contains(value)
    }

    fn entries(&self) -> Vec<String> {
        self.patterns.read().entries()
    }
}

impl ManualChecker for SpamChecker {
    fn entry_add(&self, value: &str) -> Result<AddOutcome, StoreError> {
        self.patterns.write().add(value)
    }

    fn entry_remove(&self, value: &str) -> Result<RemoveOutcome, StoreError> {
        self.patterns.write().remove(value)
    }
}
