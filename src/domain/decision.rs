use crate::domain::message::MessageRef;

/// A checker's finding for one context. Absence of a result means
/// "no match", never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Human-readable reason for the block.
    pub reason: String,
    /// Hostname if this was a host-based match (IP, bad-domains, ...);
    /// consulted for the allow-list veto.
    pub host: Option<String>,
    /// Additional messages to remediate, if the match covers more than the
    /// triggering message.
    pub messages: Option<Vec<MessageRef>>,
}

impl CheckResult {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            host: None,
            messages: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_messages(mut self, messages: Vec<MessageRef>) -> Self {
        self.messages = Some(messages);
        self
    }
}

/// Outcome of one pipeline evaluation. Enforcement (deletion, mute) is the
/// caller's job; the engine only decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Block {
        reason: String,
        messages: Vec<MessageRef>,
    },
}

impl Decision {
    pub fn is_block(&self) -> bool {
        matches!(self, Decision::Block { .. })
    }
}
