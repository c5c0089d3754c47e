use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of the bot outgoing-message log: what the assistant sent and whether
/// the exchange was resolved.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BotMessageRow {
    pub phone: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
    pub direction: String,
}

impl BotMessageRow {
    /// The table mostly records bot output; a handful of rows mirror the
    /// patient side and carry direction "in".
    pub fn is_incoming(&self) -> bool {
        self.direction.eq_ignore_ascii_case("in")
    }
}
