use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

mod config;
mod functions;
mod schema;
mod services;

use config::{MonitorConfig, ProviderConfig};
use functions::AppState;
use services::{
    MessageSource, PgGenerationLog, PgOutgoingLog, PgPatientDirectory, ProviderClient, Reconciler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL not set"))?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let provider = Arc::new(ProviderClient::new(ProviderConfig::from_env()?)?);
    let reconciler = Arc::new(Reconciler::new(
        provider.clone() as Arc<dyn MessageSource>,
        Arc::new(PgGenerationLog::new(pool.clone())),
        Arc::new(PgOutgoingLog::new(pool.clone())),
        MonitorConfig::from_env(),
    ));

    let state = Arc::new(AppState {
        reconciler,
        patients: Arc::new(PgPatientDirectory::new(pool.clone())),
        provider,
        pool,
    });

    let addr: std::net::SocketAddr = std::env::var("SANA_LISTEN_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()?;
    tracing::info!(%addr, "conversation monitor listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, functions::router(state)).await?;
    Ok(())
}
