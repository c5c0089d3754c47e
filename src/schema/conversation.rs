use serde::{Deserialize, Serialize};

use super::message::ChatMessage;

/// Derived per fetch cycle from the reconciled per-contact timelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub contact_key: String,
    pub display_name: String,
    /// Oldest first.
    pub messages: Vec<ChatMessage>,
    pub last_message: ChatMessage,
    /// Incoming messages not yet marked read.
    pub unread_count: usize,
}
