pub mod context;
pub mod decision;
pub mod message;

pub use context::CheckContext;
pub use decision::{CheckResult, Decision};
pub use message::{Embed, EmbedField, InboundMessage, MessageRef, SnapshotContent};
