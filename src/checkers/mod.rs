pub mod domains;
pub mod ip;
pub mod list;
pub mod regex;
pub mod spam;

pub use self::regex::RegexChecker;
pub use domains::DomainHashChecker;
pub use ip::IpChecker;
pub use list::{AllowList, ListChecker};
pub use spam::SpamChecker;

use async_trait::async_trait;

use crate::{
    domain::{CheckContext, CheckResult},
    net::ListFetcher,
    storage::StoreError,
};

/// Outcome of a manual add. Validation failures carry the validator's
/// message verbatim and never reach the persisted list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Duplicate,
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// A stateful rule evaluator. `check` answers whether the context matches
/// the checker's policy; the evaluation deadline is enforced by the
/// pipeline, not the checker.
#[async_trait]
pub trait Checker: Send + Sync {
    /// Returns a result if the context matched and should be blocked,
    /// `None` otherwise.
    async fn check(&self, ctx: &CheckContext) -> Option<CheckResult>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, value: &str) -> bool;

    /// Entries in insertion order.
    fn entries(&self) -> Vec<String>;
}

/// Checkers whose list is curated by operators.
pub trait ManualChecker: Checker {
    fn entry_add(&self, value: &str) -> Result<AddOutcome, StoreError>;
    fn entry_remove(&self, value: &str) -> Result<RemoveOutcome, StoreError>;
}

/// Checkers refreshed wholesale from a remote authoritative source.
/// `update` must be safe to call concurrently with `check`: readers see
/// either the old or the new list, never a mix.
#[async_trait]
pub trait ExternalChecker: Checker {
    async fn update(&self, fetcher: &dyn ListFetcher) -> anyhow::Result<()>;
}
