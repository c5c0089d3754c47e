use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Turn recorded by the automation pipeline for a conversation. The store
/// returns rows in whatever order it likes; consumers re-sort.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatLogRow {
    pub phone: String,
    pub role: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    Assistant,
    Human,
    Tool,
}

impl ChatRole {
    /// Unknown role strings yield `None`; callers skip those rows.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "assistant" => Some(Self::Assistant),
            "human" | "user" => Some(Self::Human),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }
}

impl ChatLogRow {
    pub fn role(&self) -> Option<ChatRole> {
        ChatRole::parse(&self.role)
    }
}
