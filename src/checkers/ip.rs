use std::{collections::HashMap, net::Ipv4Addr, sync::Arc};

use async_trait::async_trait;
use futures::future::join_all;
use ipnet::Ipv4Net;
use parking_lot::{Mutex, RwLock};

use crate::{
    checkers::{AddOutcome, Checker, ManualChecker, RemoveOutcome},
    domain::{CheckContext, CheckResult},
    hosts::extract_hosts,
    net::HostResolver,
    storage::{ListStore, PersistedStringSet, StoreError},
};

struct IpState {
    /// CIDR/address text exactly as the operator entered it.
    entries: PersistedStringSet,
    /// Parsed form of `entries`, same order; rebuilt on load and kept in
    /// sync on every add/remove.
    networks: Vec<Ipv4Net>,
}

/// Blocks messages whose linked hosts resolve into a configured IPv4
/// network. Resolutions are cached per hostname for the process lifetime,
/// including failures (negative caching).
pub struct IpChecker {
    state: RwLock<IpState>,
    resolver: Arc<dyn HostResolver>,
    cache: Mutex<HashMap<String, Vec<Ipv4Addr>>>,
}

impl IpChecker {
    pub fn load(
        store: Arc<dyn ListStore>,
        key: &str,
        resolver: Arc<dyn HostResolver>,
    ) -> anyhow::Result<Self> {
        let entries = PersistedStringSet::load(store, key)?;
        let networks = entries
            .iter()
            .map(|value| {
                parse_network(value)
                    .map_err(|err| anyhow::anyhow!("stored network `{value}` is invalid: {err}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            state: RwLock::new(IpState { entries, networks }),
            resolver,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Resolves all distinct hostnames, preserving first-seen order.
    /// Uncached hostnames are resolved concurrently; a cache entry is only
    /// written once its lookup has fully completed.
    async fn resolve_all(&self, hosts: &[String]) -> Vec<(String, Vec<Ipv4Addr>)> {
        let mut distinct: Vec<&str> = Vec::new();
        for host in hosts {
            if !distinct.contains(&host.as_str()) {
                distinct.push(host.as_str());
            }
        }

        let mut resolved: HashMap<&str, Vec<Ipv4Addr>> = HashMap::new();
        let mut pending: Vec<&str> = Vec::new();
        {
            let cache = self.cache.lock();
            for host in &distinct {
                match cache.get(*host) {
                    Some(addrs) => {
                        resolved.insert(*host, addrs.clone());
                    }
                    None => pending.push(*host),
                }
            }
        }

        if !pending.is_empty() {
            let lookups = pending.iter().map(|host| self.resolve_one(host));
            for (host, addrs) in pending.iter().zip(join_all(lookups).await) {
                resolved.insert(*host, addrs);
            }
        }

        distinct
            .into_iter()
            .map(|host| {
                let addrs = resolved.remove(host).unwrap_or_default();
                (host.to_string(), addrs)
            })
            .collect()
    }

    async fn resolve_one(&self, host: &str) -> Vec<Ipv4Addr> {
        let addrs = match self.resolver.resolve_ipv4(host).await {
            Ok(addrs) => addrs,
            Err(err) => {
                tracing::debug!(
                    target: "filter",
                    host,
                    error = %err,
                    "resolution failed, caching empty result"
                );
                Vec::new()
            }
        };
        self.cache.lock().insert(host.to_string(), addrs.clone());
        addrs
    }
}

/// Bare addresses are treated as /32 networks.
fn parse_network(value: &str) -> Result<Ipv4Net, String> {
    if value.contains('/') {
        value.parse::<Ipv4Net>().map_err(|err| err.to_string())
    } else {
        value
            .parse::<Ipv4Addr>()
            .map(Ipv4Net::from)
            .map_err(|err| err.to_string())
    }
}

#[async_trait]
impl Checker for IpChecker {
    async fn check(&self, ctx: &CheckContext) -> Option<CheckResult> {
        let hosts = extract_hosts(&ctx.text);
        if hosts.is_empty() || self.state.read().networks.is_empty() {
            return None;
        }

        let resolved = self.resolve_all(&hosts).await;

        let state = self.state.read();
        for network in &state.networks {
            for (host, addrs) in &resolved {
                if let Some(addr) = addrs.iter().find(|addr| network.contains(*addr)) {
                    return Some(
                        CheckResult::new(format!(
                            "filtered IP: `{addr}` (network: `{network}`, host: `{host}`)"
                        ))
                        .with_host(host.clone()),
                    );
                }
            }
        }
        None
    }

    fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    fn contains(&self, value: &str) -> bool {
        self.state.read().entries.contains(value)
    }

    fn entries(&self) -> Vec<String> {
        self.state.read().entries.entries()
    }
}

impl ManualChecker for IpChecker {
    fn entry_add(&self, value: &str) -> Result<AddOutcome, StoreError> {
        let network = match parse_network(value) {
            Ok(network) => network,
            Err(err) => return Ok(AddOutcome::Invalid(err)),
        };
        let mut state = self.state.write();
        if !state.entries.insert(value)? {
            return Ok(AddOutcome::Duplicate);
        }
        state.networks.push(network);
        Ok(AddOutcome::Added)
    }

    fn entry_remove(&self, value: &str) -> Result<RemoveOutcome, StoreError> {
        let mut state = self.state.write();
        let Some(pos) = state.entries.position(value) else {
            return Ok(RemoveOutcome::NotFound);
        };
        state.entries.remove(value)?;
        state.networks.remove(pos);
        Ok(RemoveOutcome::Removed)
    }
}
