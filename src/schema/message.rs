use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Text,
    Image,
    Audio,
    Video,
    Document,
    Sticker,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[default]
    Sent,
    Delivered,
    Read,
}

/// One message in a reconciled conversation timeline. Rebuilt from the
/// three sources on every fetch cycle, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    /// Provider key for lazy media retrieval; empty for log-only messages.
    pub source_message_key: String,
    pub contact_key: String,
    pub sender_label: String,
    pub direction: Direction,
    pub text: String,
    pub media_kind: MediaKind,
    pub media_locator: Option<String>,
    pub timestamp_ms: i64,
    pub delivery_status: DeliveryStatus,
    /// Only meaningful when `direction` is `Out`.
    pub is_automated: bool,
}

impl ChatMessage {
    pub fn is_unread_incoming(&self) -> bool {
        self.direction == Direction::In && self.delivery_status != DeliveryStatus::Read
    }
}
