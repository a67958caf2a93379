use chrono::{DateTime, Utc};

use crate::domain::message::{Embed, InboundMessage, MessageRef};

/// Normalized, checker-agnostic view of one unit of message content.
/// Built once per message (or per snapshot); the flattened text is never
/// re-derived mid-pipeline.
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub author_id: i64,
    pub author_display: String,
    pub message: MessageRef,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_snapshot: bool,
}

impl CheckContext {
    pub fn primary(msg: &InboundMessage) -> Self {
        Self {
            author_id: msg.author_id,
            author_display: msg.author_display.clone(),
            message: msg.message,
            text: flatten_text(&msg.content, &msg.embeds),
            timestamp: msg.timestamp,
            is_snapshot: false,
        }
    }

    /// One context per snapshot, sharing the author and handle of the
    /// carrying message.
    pub fn snapshots(msg: &InboundMessage) -> Vec<Self> {
        msg.snapshots
            .iter()
            .map(|snapshot| Self {
                author_id: msg.author_id,
                author_display: msg.author_display.clone(),
                message: msg.message,
                text: flatten_text(&snapshot.content, &snapshot.embeds),
                timestamp: msg.timestamp,
                is_snapshot: true,
            })
            .collect()
    }
}

fn flatten_text(content: &str, embeds: &[Embed]) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !content.is_empty() {
        parts.push(content.to_string());
    }
    for embed in embeds {
        if let Some(title) = embed.title.as_deref().filter(|s| !s.is_empty()) {
            parts.push(title.to_string());
        }
        if let Some(desc) = embed.description.as_deref().filter(|s| !s.is_empty()) {
            parts.push(desc.to_string());
        }
        for field in &embed.fields {
            parts.push(format!("{}: {}", field.name, field.value));
        }
    }
    parts.join("\n")
}
