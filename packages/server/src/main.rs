use std::sync::Arc;

use anyhow::Context;
use common::storage::KeyedBlobStore;
use common::storage::filesystem::FilesystemKeyedStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use picture_server::config::AppConfig;
use picture_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let store = FilesystemKeyedStore::from_config(&config.storage)
        .await
        .with_context(|| {
            format!(
                "Failed to open picture store at {}",
                config.storage.directory.display()
            )
        })?;

    if config.storage.reconcile_on_start {
        let report = store
            .reconcile()
            .await
            .context("Failed to reconcile picture store")?;
        info!(
            scanned = report.scanned,
            skipped = report.skipped,
            kept = report.kept,
            removed = report.removed,
            "Picture store reconciled"
        );
    }

    let state = AppState {
        store: Arc::new(store),
        config: config.clone(),
    };
    let app = picture_server::build_router(state);

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| {
            format!(
                "Failed to bind {}:{}",
                config.server.host, config.server.port
            )
        })?;
    info!("Server is running on port {}", config.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}
