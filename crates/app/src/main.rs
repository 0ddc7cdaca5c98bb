mod auth;
mod dashboard;
mod onboarding;
mod password;
mod pipeline;
mod problem;
mod router;
mod session;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use onboard_capture::fingerprint::SimulatedScanner;
use onboard_core::store::BlobStore;
use onboard_storage::{Database, FsBlobStore};
use onboard_util::{load_env_file, AppConfig, ArtifactPolicy};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;

    let blobs: Option<Arc<dyn BlobStore>> = match (&config.artifact_policy, &config.blob_root) {
        (ArtifactPolicy::Upload, Some(root)) => Some(Arc::new(FsBlobStore::open(root.clone()).await?)),
        _ => None,
    };

    let state = router::AppState::new(
        metrics,
        database,
        &config.session_secret,
        config.session_ttl_secs,
        config.artifact_policy,
        blobs,
        Arc::new(SimulatedScanner::default()),
    );

    let addr: SocketAddr = config.bind_addr;
    info!(
        stage = "app",
        %addr,
        env = %config.environment.as_str(),
        policy = config.artifact_policy.as_str(),
        "starting HTTP server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
