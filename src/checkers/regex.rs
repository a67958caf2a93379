use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};

use crate::{
    checkers::{AddOutcome, Checker, ManualChecker, RemoveOutcome},
    domain::{CheckContext, CheckResult},
    storage::{ListStore, PersistedStringSet, StoreError},
};

/// Persisted regex list plus its compiled form, kept in lock-step. Shared
/// by the regex and spam checkers, which use the same add-time validation
/// and multi-line match semantics.
pub(crate) struct PatternSet {
    entries: PersistedStringSet,
    compiled: Vec<Regex>,
}

impl PatternSet {
    pub(crate) fn load(store: Arc<dyn ListStore>, key: &str) -> anyhow::Result<Self> {
        let entries = PersistedStringSet::load(store, key)?;
        let compiled = entries
            .iter()
            .map(|pattern| {
                compile(pattern)
                    .map_err(|err| anyhow::anyhow!("stored pattern `{pattern}` is invalid: {err}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { entries, compiled })
    }

    pub(crate) fn add(&mut self, value: &str) -> Result<AddOutcome, StoreError> {
        let regex = match compile(value) {
            Ok(regex) => regex,
            Err(err) => return Ok(AddOutcome::Invalid(err.to_string())),
        };
        if !self.entries.insert(value)? {
            return Ok(AddOutcome::Duplicate);
        }
        self.compiled.push(regex);
        Ok(AddOutcome::Added)
    }

    pub(crate) fn remove(&mut self, value: &str) -> Result<RemoveOutcome, StoreError> {
        let Some(pos) = self.entries.position(value) else {
            return Ok(RemoveOutcome::NotFound);
        };
        self.entries.remove(value)?;
        self.compiled.remove(pos);
        Ok(RemoveOutcome::Removed)
    }

    /// First pattern (insertion order) with a match; returns the pattern
    /// text and the matched substring.
    pub(crate) fn find_first(&self, text: &str) -> Option<(String, String)> {
        self.entries
            .iter()
            .zip(&self.compiled)
            .find_map(|(pattern, regex)| {
                regex
                    .find(text)
                    .map(|m| (pattern.to_string(), m.as_str().to_string()))
            })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn contains(&self, value: &str) -> bool {
        self.entries.contains(value)
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.entries.entries()
    }
}

/// `^`/`$` anchor per line, `.` does not cross lines.
fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).multi_line(true).build()
}

/// Pattern blocklist. Patterns are validated at insert time; an invalid
/// pattern never enters the persisted list.
pub struct RegexChecker {
    patterns: RwLock<PatternSet>,
}

impl RegexChecker {
    pub fn load(store: Arc<dyn ListStore>, key: &str) -> anyhow::Result<Self> {
        Ok(Self {
            patterns: RwLock::new(PatternSet::load(store, key)?),
        })
    }
}

#[async_trait]
impl Checker for RegexChecker {
    async fn check(&self, ctx: &CheckContext) -> Option<CheckResult> {
        let (pattern, matched) = self.patterns.read().find_first(&ctx.text)?;
        Some(CheckResult::new(format!(
            "filtered string: `{matched}` (regex: `{pattern}`)"
        )))
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

impl ManualChecker for RegexChecker {
    fn entry_add(&self, value: &str) -> Result<AddOutcome, StoreError> {
        self.patterns.write().add(value)
    }

    fn entry_remove(&self, value: &str) -> Result<RemoveOutcome, StoreError> {
        self.patterns.write().remove(value)
    }
}
