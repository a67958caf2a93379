use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    checkers::{AddOutcome, Checker, ManualChecker, RemoveOutcome},
    domain::{CheckContext, CheckResult},
    storage::{ListStore, PersistedStringSet, StoreError},
};

/// Exact-substring blocklist. The first configured entry (insertion
/// order) found anywhere in the context text wins; matching is
/// case-sensitive.
pub struct ListChecker {
    entries: RwLock<PersistedStringSet>,
}

impl ListChecker {
    pub fn load(store: Arc<dyn ListStore>, key: &str) -> Result<Self, StoreError> {
        Ok(Self {
            entries: RwLock::new(PersistedStringSet::load(store, key)?),
        })
    }
}

#[async_trait]
impl Checker for ListChecker {
    async fn check(&self, ctx: &CheckContext) -> Option<CheckResult> {
        let entries = self.entries.read();
        let result = entries
            .iter()
            .find(|entry| ctx.text.contains(entry))
            .map(|entry| CheckResult::new(format!("filtered string: `{entry}`")));
        result
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn contains(&self, value: &str) -> bool {
        self.entries.read().contains(value)
    }

    fn entries(&self) -> Vec<String> {
        self.entries.read().entries()
    }
}

impl ManualChecker for ListChecker {
    fn entry_add(&self, value: &str) -> Result<AddOutcome, StoreError> {
        Ok(if self.entries.write().insert(value)? {
            AddOutcome::Added
        } else {
            AddOutcome::Duplicate
        })
    }

    fn entry_remove(&self, value: &str) -> Result<RemoveOutcome, StoreError> {
        Ok(if self.entries.write().remove(value)? {
            RemoveOutcome::Removed
        } else {
            RemoveOutcome::NotFound
        })
    }
}

/// Manually curated set of permitted hostnames. Never runs as a blocking
/// checker; the pipeline consults it to veto host-based matches. Unlike
/// `ListChecker`, membership is exact equality on the hostname.
pub struct AllowList {
    entries: RwLock<PersistedStringSet>,
}

impl AllowList {
    pub fn load(store: Arc<dyn ListStore>, key: &str) -> Result<Self, StoreError> {
        Ok(Self {
            entries: RwLock::new(PersistedStringSet::load(store, key)?),
        })
    }

    pub fn contains_host(&self, host: &str) -> bool {
        self.entries.read().contains(host)
    }
}

#[async_trait]
impl Checker for AllowList {
    /// The allow-list never blocks on its own.
    async fn check(&self, _ctx: &CheckContext) -> Option<CheckResult> {
        None
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn contains(&self, value: &str) -> bool {
        self.entries.read().contains(value)
    }

    fn entries(&self) -> Vec<String> {
        self.entries.read().entries()
    }
}

impl ManualChecker for AllowList {
    fn entry_add(&self, value: &str) -> Result<AddOutcome, StoreError> {
        Ok(if self.entries.write().insert(value)? {
            AddOutcome::Added
        } else {
            AddOutcome::Duplicate
        })
    }

    fn entry_remove(&self, value: &str) -> Result<RemoveOutcome, StoreError> {
        Ok(if self.entries.write().remove(value)? {
            RemoveOutcome::Removed
        } else {
            RemoveOutcome::NotFound
        })
    }
}
