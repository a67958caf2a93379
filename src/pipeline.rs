use std::{collections::HashMap, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::time::timeout;

use crate::{
    checkers::{
        AddOutcome, AllowList, Checker, DomainHashChecker, ExternalChecker, IpChecker,
        ListChecker, ManualChecker, RegexChecker, RemoveOutcome, SpamChecker,
    },
    config::FilterConfig,
    domain::{CheckContext, Decision, InboundMessage},
    net::{HostResolver, ListFetcher},
    storage::{ListStore, StoreError},
};

/// Name the allow-list is registered under; it is consulted for the veto
/// and exposed for manual curation, but never runs as a blocking checker.
pub const ALLOWLIST_NAME: &str = "allowed_hosts";

struct RegisteredChecker {
    checker: Arc<dyn Checker>,
    manual: Option<Arc<dyn ManualChecker>>,
    external: Option<Arc<dyn ExternalChecker>>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown checker: {0}")]
    UnknownChecker(String),
    #[error("checker {0} does not support manual entries")]
    NotManual(String),
    #[error("checker {0} does not support external updates")]
    NotExternal(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Named checkers in a stable, registration-defined order. Doubles as the
/// administrative surface: add/remove/list per checker and the manual
/// external-refresh trigger.
#[derive(Default)]
pub struct CheckerRegistry {
    order: Vec<String>,
    checkers: HashMap<String, RegisteredChecker>,
}

impl CheckerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, checker: Arc<dyn Checker>) {
        self.insert(
            name,
            RegisteredChecker {
                checker,
                manual: None,
                external: None,
            },
        );
    }

    pub fn register_manual<C>(&mut self, name: &str, checker: Arc<C>)
    where
        C: ManualChecker + 'static,
    {
        self.insert(
            name,
            RegisteredChecker {
                checker: checker.clone(),
                manual: Some(checker),
                external: None,
            },
        );
    }

    pub fn register_external<C>(&mut self, name: &str, checker: Arc<C>)
    where
        C: ExternalChecker + 'static,
    {
        self.insert(
            name,
            RegisteredChecker {
                checker: checker.clone(),
                manual: None,
                external: Some(checker),
            },
        );
    }

    fn insert(&mut self, name: &str, entry: RegisteredChecker) {
        if self.checkers.insert(name.to_string(), entry).is_none() {
            self.order.push(name.to_string());
        }
    }

    /// Registered names in evaluation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    fn get(&self, name: &str) -> Result<&RegisteredChecker, RegistryError> {
        self.checkers
            .get(name)
            .ok_or_else(|| RegistryError::UnknownChecker(name.to_string()))
    }

    pub fn entries(&self, name: &str) -> Result<Vec<String>, RegistryError> {
        Ok(self.get(name)?.checker.entries())
    }

    pub fn entry_add(&self, name: &str, value: &str) -> Result<AddOutcome, RegistryError> {
        let entry = self.get(name)?;
        let manual = entry
            .manual
            .as_ref()
            .ok_or_else(|| RegistryError::NotManual(name.to_string()))?;
        tracing::info!(target: "filter", checker = name, value, "adding list entry");
        Ok(manual.entry_add(value)?)
    }

    pub fn entry_remove(&self, name: &str, value: &str) -> Result<RemoveOutcome, RegistryError> {
        let entry = self.get(name)?;
        let manual = entry
            .manual
            .as_ref()
            .ok_or_else(|| RegistryError::NotManual(name.to_string()))?;
        tracing::info!(target: "filter", checker = name, value, "removing list entry");
        Ok(manual.entry_remove(value)?)
    }

    /// Manual refresh trigger for a single externally sourced checker.
    pub async fn update_checker(
        &self,
        name: &str,
        fetcher: &dyn ListFetcher,
    ) -> anyhow::Result<()> {
        let entry = self.get(name)?;
        let external = entry
            .external
            .as_ref()
            .ok_or_else(|| RegistryError::NotExternal(name.to_string()))?;
        external.update(fetcher).await
    }

    /// Refreshes every externally sourced checker, collecting failures
    /// instead of aborting on the first one.
    pub async fn update_external(
        &self,
        fetcher: &dyn ListFetcher,
    ) -> Vec<(String, anyhow::Error)> {
        let mut failures = Vec::new();
        for name in &self.order {
            let Some(external) = self.checkers[name].external.as_ref() else {
                continue;
            };
            if let Err(err) = external.update(fetcher).await {
                failures.push((name.clone(), err));
            }
        }
        failures
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Checker>)> {
        self.order
            .iter()
            .map(move |name| (name.as_str(), &self.checkers[name].checker))
    }
}

/// Runs the registered checkers over a message context in order,
/// enforcing the per-checker timeout and the allow-list veto.
///
/// Evaluation order is the registration order: `strings`, `regex`,
/// `bad_domains`, `spam_regex`, `ips`.
pub struct FilterEngine {
    registry: CheckerRegistry,
    allowlist: Arc<AllowList>,
    check_timeout: Duration,
}

impl FilterEngine {
    /// Wires the default checker set from persisted state.
    pub fn new(
        config: &FilterConfig,
        store: Arc<dyn ListStore>,
        resolver: Arc<dyn HostResolver>,
    ) -> anyhow::Result<Self> {
        let allowlist = Arc::new(AllowList::load(store.clone(), "allowlist.json")?);

        let mut registry = CheckerRegistry::new();
        registry.register_manual(ALLOWLIST_NAME, allowlist.clone());
        registry.register_manual(
            "strings",
            Arc::new(ListChecker::load(store.clone(), "blocklist.json")?),
        );
        registry.register_manual(
            "regex",
            Arc::new(RegexChecker::load(store.clone(), "blocklist_regex.json")?),
        );
        registry.register_external(
            "bad_domains",
            Arc::new(DomainHashChecker::load(
                store.clone(),
                "bad_domains.json",
                config.bad_domains_url.clone(),
            )?),
        );
        registry.register_manual(
            "spam_regex",
            Arc::new(SpamChecker::load(
                store.clone(),
                "blocklist_spam.json",
                config.spam.clone(),
            )?),
        );
        registry.register_manual(
            "ips",
            Arc::new(IpChecker::load(store, "blocklist_ips.json", resolver)?),
        );

        Ok(Self {
            registry,
            allowlist,
            check_timeout: config.check_timeout,
        })
    }

    /// Engine over an explicit registry, for non-default checker sets.
    pub fn with_registry(
        registry: CheckerRegistry,
        allowlist: Arc<AllowList>,
        check_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            allowlist,
            check_timeout,
        }
    }

    pub fn registry(&self) -> &CheckerRegistry {
        &self.registry
    }

    /// Evaluates one context. Returns on the first match that survives
    /// the allow-list veto; timeouts count as "no opinion".
    pub async fn evaluate(&self, ctx: &CheckContext) -> Decision {
        for (name, checker) in self.registry.iter() {
            if name == ALLOWLIST_NAME {
                continue;
            }

            let result = match timeout(self.check_timeout, checker.check(ctx)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        target: "filter",
                        checker = name,
                        message_id = ctx.message.message_id,
                        "checker evaluation timed out"
                    );
                    None
                }
            };
            let Some(result) = result else {
                continue;
            };

            // The veto suppresses this checker's finding only; later
            // checkers still run.
            if let Some(host) = &result.host {
                if self.allowlist.contains_host(host) {
                    tracing::info!(
                        target: "filter",
                        checker = name,
                        host = %host,
                        "preventing block, host is allowed explicitly"
                    );
                    continue;
                }
            }

            let messages = result.messages.unwrap_or_else(|| vec![ctx.message]);
            tracing::info!(
                target: "filter",
                checker = name,
                author = %ctx.author_display,
                author_id = ctx.author_id,
                message_id = ctx.message.message_id,
                snapshot = ctx.is_snapshot,
                reason = %result.reason,
                messages = messages.len(),
                "blocking message"
            );
            return Decision::Block {
                reason: result.reason,
                messages,
            };
        }
        Decision::Allow
    }

    /// Evaluates the primary content, then each snapshot independently,
    /// short-circuiting on the first block.
    pub async fn evaluate_message(&self, msg: &InboundMessage) -> Decision {
        let primary = CheckContext::primary(msg);
        let decision = self.evaluate(&primary).await;
        if decision.is_block() {
            return decision;
        }

        for snapshot in CheckContext::snapshots(msg) {
            let decision = self.evaluate(&snapshot).await;
            if decision.is_block() {
                return decision;
            }
        }
        Decision::Allow
    }
}
