//! Content-moderation filtering engine for chat messages.
//!
//! Inbound messages are reduced to a [`CheckContext`] and evaluated by a
//! fixed-order set of checkers (string list, regex list, hashed bad
//! domains, spam window, IP blocklist) with a per-checker timeout and an
//! allow-list veto for host-based matches. The engine only decides;
//! deletion and muting are the caller's job.

pub mod checkers;
pub mod config;
pub mod domain;
pub mod hosts;
pub mod logging;
pub mod net;
pub mod pipeline;
pub mod refresh;
pub mod storage;

pub use config::{load_config, FilterConfig, SpamConfig};
pub use domain::{CheckContext, CheckResult, Decision, InboundMessage, MessageRef};
pub use pipeline::{CheckerRegistry, FilterEngine, RegistryError, ALLOWLIST_NAME};
pub use storage::{FileStore, ListStore, MemoryStore, PersistedStringSet, StoreError};
