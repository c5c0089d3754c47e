use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Patient record, used only to resolve display names for conversation
/// summaries. Never used for identity merging.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}
