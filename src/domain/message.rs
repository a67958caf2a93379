use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Handle to a message on the chat platform, sufficient for later deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

/// Structured text attached to a message (link previews, rich embeds).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<EmbedField>,
}

/// Secondary content carried by a message, e.g. a forwarded original.
/// Shares the author identity of the carrying message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotContent {
    pub content: String,
    pub embeds: Vec<Embed>,
}

/// Gateway-agnostic view of an inbound chat message as handed to the engine.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub author_id: i64,
    pub author_display: String,
    pub message: MessageRef,
    pub content: String,
    pub embeds: Vec<Embed>,
    pub snapshots: Vec<SnapshotContent>,
    pub timestamp: DateTime<Utc>,
}
