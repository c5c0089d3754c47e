//! Read-only HTTP surface over the reconciliation engine.
//!
//! Every handler is best-effort: engine-level failures have already been
//! degraded to empty contributions, so the worst case here is an empty
//! collection, never a 5xx.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::schema::{ChatMessage, Conversation, MediaKind};
use crate::services::{
    PatientDirectory, PatientNameIndex, ProviderClient, Reconciler, aggregate,
    provider::MediaPayload,
};

pub struct AppState {
    pub reconciler: Arc<Reconciler>,
    pub patients: Arc<dyn PatientDirectory>,
    pub provider: Arc<ProviderClient>,
    pub pool: PgPool,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/conversations", get(list_conversations))
        .route(
            "/api/conversations/{contact}/messages",
            get(conversation_messages),
        )
        .route("/api/media", post(fetch_media))
        .route("/api/health", get(get_health))
        .with_state(state)
}

async fn patient_names(state: &AppState) -> PatientNameIndex {
    match state.patients.all().await {
        Ok(patients) => PatientNameIndex::build(&patients),
        Err(e) => {
            tracing::warn!(source = "patients", error = %e, "patient lookup failed, using raw keys");
            PatientNameIndex::empty()
        }
    }
}

async fn list_conversations(State(state): State<Arc<AppState>>) -> Json<Vec<Conversation>> {
    let timelines = state.reconciler.reconcile().await;
    let names = patient_names(&state).await;
    Json(aggregate(timelines, &names))
}

async fn conversation_messages(
    State(state): State<Arc<AppState>>,
    Path(contact): Path<String>,
) -> Json<Vec<ChatMessage>> {
    let mut timelines = state.reconciler.reconcile().await;
    Json(timelines.remove(&contact).unwrap_or_default())
}

#[derive(Debug, Deserialize)]
pub struct MediaRequest {
    pub message_key: String,
    pub kind: MediaKind,
}

/// `null` on failure; the dashboard shows a retry affordance and the
/// message list renders regardless.
async fn fetch_media(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MediaRequest>,
) -> Json<Option<MediaPayload>> {
    Json(state.provider.fetch_media(&req.message_key, req.kind).await)
}

#[derive(Debug, Serialize)]
pub struct HealthView {
    pub database_reachable: bool,
    pub provider_instance: String,
}

async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthView> {
    let database_reachable = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .is_ok();

    Json(HealthView {
        database_reachable,
        provider_instance: state.provider.instance().to_string(),
    })
}
