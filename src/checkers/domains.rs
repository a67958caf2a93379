use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::{
    checkers::{Checker, ExternalChecker},
    domain::{CheckContext, CheckResult},
    hosts::extract_hosts,
    net::ListFetcher,
    storage::{ListStore, PersistedStringSet, StoreError},
};

/// Matches linked hostnames against an externally maintained list of
/// salted/hashed bad domains. The remote source is pre-hashed; the stored
/// set holds lower-case hex digests, never raw domains.
pub struct DomainHashChecker {
    hashes: RwLock<PersistedStringSet>,
    url: String,
}

impl DomainHashChecker {
    pub fn load(
        store: Arc<dyn ListStore>,
        key: &str,
        url: impl Into<String>,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            hashes: RwLock::new(PersistedStringSet::load(store, key)?),
            url: url.into(),
        })
    }
}

fn hash_host(host: &str) -> String {
    let digest = Sha256::digest(host.to_lowercase().as_bytes());
    format!("{digest:x}")
}

#[async_trait]
impl Checker for DomainHashChecker {
    async fn check(&self, ctx: &CheckContext) -> Option<CheckResult> {
        let hashes = self.hashes.read();
        for host in extract_hosts(&ctx.text) {
            if hashes.contains(&hash_host(&host)) {
                return Some(
                    CheckResult::new(format!("filtered host: `{host}` (bad-domains hash)"))
                        .with_host(host),
                );
            }
        }
        None
    }

    fn len(&self) -> usize {
        self.hashes.read().len()
    }

    fn contains(&self, value: &str) -> bool {
        self.hashes.read().contains(value)
    }

    fn entries(&self) -> Vec<String> {
        self.hashes.read().entries()
    }
}

#[async_trait]
impl ExternalChecker for DomainHashChecker {
    /// Wholesale replacement from the remote source. A failed fetch or a
    /// malformed payload leaves the previous set untouched.
    async fn update(&self, fetcher: &dyn ListFetcher) -> anyhow::Result<()> {
        let body = fetcher.get(&self.url).await?;
        let hashes: Vec<String> = serde_json::from_slice(&body)
            .context("bad-domains payload is not a JSON array of strings")?;
        let hashes: Vec<String> = hashes.into_iter().map(|h| h.to_lowercase()).collect();
        let count = hashes.len();
        self.hashes.write().replace_all(hashes)?;
        tracing::info!(target: "filter", count, "bad-domains list refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::MessageRef, storage::MemoryStore};
    use anyhow::anyhow;
    use chrono::Utc;

    struct StubFetcher {
        response: Result<Vec<u8>, String>,
    }

    #[async_trait]
    impl ListFetcher for StubFetcher {
        async fn get(&self, _url: &str) -> anyhow::Result<Vec<u8>> {
            self.response
                .clone()
                .map_err(|err| anyhow!(err))
        }
    }

    fn context(text: &str) -> CheckContext {
        CheckContext {
            author_id: 1,
            author_display: "user".to_string(),
            message: MessageRef {
                channel_id: 1,
                message_id: 1,
            },
            text: text.to_string(),
            timestamp: Utc::now(),
            is_snapshot: false,
        }
    }

    fn checker() -> DomainHashChecker {
        DomainHashChecker::load(
            Arc::new(MemoryStore::new()),
            "bad_domains.json",
            "https://lists.example/bad-domains.json",
        )
        .unwrap()
    }

    fn payload(hashes: &[&str]) -> Vec<u8> {
        serde_json::to_vec(hashes).unwrap()
    }

    #[tokio::test]
    async fn matches_hashed_host_case_insensitively() {
        let checker = checker();
        let fetcher = StubFetcher {
            response: Ok(payload(&[&hash_host("bad.example")])),
        };
        checker.update(&fetcher).await.unwrap();

        let result = checker
            .check(&context("check out http://BAD.example/x"))
            .await
            .unwrap();
        assert_eq!(result.host.as_deref(), Some("BAD.example"));
        assert!(result.reason.contains("bad-domains hash"));
    }

    #[tokio::test]
    async fn update_replaces_prior_content_entirely() {
        let checker = checker();
        let first = StubFetcher {
            response: Ok(payload(&[&hash_host("old.example")])),
        };
        checker.update(&first).await.unwrap();
        assert!(checker.check(&context("http://old.example/")).await.is_some());

        let second = StubFetcher {
            response: Ok(payload(&["abc123"])),
        };
        checker.update(&second).await.unwrap();
        assert!(checker.check(&context("http://old.example/")).await.is_none());
        assert_eq!(checker.entries(), vec!["abc123".to_string()]);
    }

    #[tokio::test]
    async fn failed_fetch_retains_previous_set() {
        let checker = checker();
        let ok = StubFetcher {
            response: Ok(payload(&["abc123"])),
        };
        checker.update(&ok).await.unwrap();

        let failing = StubFetcher {
            response: Err("status 503".to_string()),
        };
        assert!(checker.update(&failing).await.is_err());
        assert_eq!(checker.entries(), vec!["abc123".to_string()]);
    }

    #[tokio::test]
    async fn fetched_hashes_are_lowercased() {
        let checker = checker();
        let upper = hash_host("bad.example").to_uppercase();
        let fetcher = StubFetcher {
            response: Ok(payload(&[&upper])),
        };
        checker.update(&fetcher).await.unwrap();
        assert!(checker.check(&context("http://bad.example/")).await.is_some());
    }
}
