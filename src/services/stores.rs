//! Read seams over the externally owned tables.
//!
//! The schema belongs to the booking system and the automation pipeline;
//! this crate only reads. Traits keep the reconciler testable without a
//! database.

use sqlx::PgPool;

use crate::schema::{BotMessageRow, ChatLogRow, Patient};

#[async_trait::async_trait]
pub trait GenerationLog: Send + Sync {
    /// Full chat-history read; ordering is whatever the store returns.
    async fn read_all(&self) -> anyhow::Result<Vec<ChatLogRow>>;
}

#[async_trait::async_trait]
pub trait OutgoingLog: Send + Sync {
    async fn contact_keys(&self) -> anyhow::Result<Vec<String>>;
    async fn for_contact(&self, contact_key: &str) -> anyhow::Result<Vec<BotMessageRow>>;
}

#[async_trait::async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn all(&self) -> anyhow::Result<Vec<Patient>>;
}

pub struct PgGenerationLog {
    pool: PgPool,
}

impl PgGenerationLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl GenerationLog for PgGenerationLog {
    async fn read_all(&self) -> anyhow::Result<Vec<ChatLogRow>> {
        let rows = sqlx::query_as::<_, ChatLogRow>(
            "SELECT phone, role, message, created_at FROM chat_history",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

pub struct PgOutgoingLog {
    pool: PgPool,
}

impl PgOutgoingLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OutgoingLog for PgOutgoingLog {
    async fn contact_keys(&self) -> anyhow::Result<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>("SELECT DISTINCT phone FROM bot_messages")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }

    async fn for_contact(&self, contact_key: &str) -> anyhow::Result<Vec<BotMessageRow>> {
        let rows = sqlx::query_as::<_, BotMessageRow>(
            "SELECT phone, message, created_at, resolved, direction \
             FROM bot_messages WHERE phone = $1 ORDER BY created_at",
        )
        .bind(contact_key)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

pub struct PgPatientDirectory {
    pool: PgPool,
}

impl PgPatientDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PatientDirectory for PgPatientDirectory {
    async fn all(&self) -> anyhow::Result<Vec<Patient>> {
        let rows =
            sqlx::query_as::<_, Patient>("SELECT id, name, phone FROM patients WHERE phone IS NOT NULL")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }
}
