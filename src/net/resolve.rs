use std::net::{IpAddr, Ipv4Addr};

use anyhow::{Context, Result};
use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;

/// DNS resolution abstraction. Tests substitute a stub; production wires
/// the system resolver.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>>;
}

pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn from_system_conf() -> Result<Self> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf()
            .context("failed to read system resolver configuration")?;
        Ok(Self { resolver })
    }
}

#[async_trait]
impl HostResolver for DnsResolver {
    async fn resolve_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>> {
        let lookup = self
            .resolver
            .lookup_ip(host)
            .await
            .with_context(|| format!("lookup failed for {host}"))?;
        Ok(lookup
            .iter()
            .filter_map(|addr| match addr {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .collect())
    }
}
