use std::time::Duration;

use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Remote fetch abstraction used by externally refreshed checkers.
#[async_trait]
pub trait ListFetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl ListFetcher for HttpFetcher {
    async fn get(&self, raw_url: &str) -> Result<Vec<u8>> {
        let url = Url::parse(raw_url).with_context(|| format!("invalid url {raw_url}"))?;
        ensure!(
            matches!(url.scheme(), "http" | "https"),
            "unsupported scheme {}",
            url.scheme()
        );

        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("fetch of {url} returned error status"))?;

        Ok(response.bytes().await?.to_vec())
    }
}
