//! Chat messages
//!
//! A [`Message`] is an immutable record of one entry in a conversation. Once
//! appended, ownership moves into the conversation's history buffer.

use crate::types::Timestamp;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Maximum number of characters in a conversation preview
pub const PREVIEW_MAX_CHARS: usize = 50;

/// Kind of message content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Text,
    File,
    Image,
    System,
    Error,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Text => write!(f, "Text"),
            MessageKind::File => write!(f, "File"),
            MessageKind::Image => write!(f, "Image"),
            MessageKind::System => write!(f, "System"),
            MessageKind::Error => write!(f, "Error"),
        }
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    sender_name: String,
    content: String,
    timestamp: Timestamp,
    is_from_me: bool,
    kind: MessageKind,
}

impl Message {
    /// Create a message
    pub fn new(
        sender_name: impl Into<String>,
        content: impl Into<String>,
        timestamp: Timestamp,
        is_from_me: bool,
        kind: MessageKind,
    ) -> Self {
        Self {
            sender_name: sender_name.into(),
            content: content.into(),
            timestamp,
            is_from_me,
            kind,
        }
    }

    /// Inbound message from a remote peer
    pub fn inbound(
        sender_name: impl Into<String>,
        content: impl Into<String>,
        timestamp: Timestamp,
        kind: MessageKind,
    ) -> Self {
        Self::new(sender_name, content, timestamp, false, kind)
    }

    /// Outbound message authored locally
    pub fn outbound(
        sender_name: impl Into<String>,
        content: impl Into<String>,
        timestamp: Timestamp,
        kind: MessageKind,
    ) -> Self {
        Self::new(sender_name, content, timestamp, true, kind)
    }

    pub fn sender_name(&self) -> &str {
        &self.sender_name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn is_from_me(&self) -> bool {
        self.is_from_me
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// One-line preview for conversation lists
    ///
    /// File and image messages carry an icon prefix; long previews are cut to
    /// `PREVIEW_MAX_CHARS` including a trailing ellipsis.
    pub fn preview(&self) -> String {
        let preview = match self.kind {
            MessageKind::File => format!("📁 {}", self.content),
            MessageKind::Image => format!("🖼️ {}", self.content),
            MessageKind::Text | MessageKind::System | MessageKind::Error => self.content.clone(),
        };

        if preview.chars().count() > PREVIEW_MAX_CHARS {
            let mut cut: String = preview.chars().take(PREVIEW_MAX_CHARS - 3).collect();
            cut.push_str("...");
            cut
        } else {
            preview
        }
    }
}
