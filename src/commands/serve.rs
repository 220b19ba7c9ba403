use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing::{info, warn};

use supportdesk::api::{self, AppState};
use supportdesk::classify::{Classifier, ClassifierConfig};
use supportdesk::db::Database;

pub struct ServeConfig {
    pub bind: SocketAddr,
    pub admin_tokens: Vec<String>,
    pub classifier: ClassifierConfig,
}

pub async fn run(db: Database, config: ServeConfig) -> Result<()> {
    if config.admin_tokens.iter().all(|t| t.trim().is_empty()) {
        warn!("No admin tokens configured; stats and updates will be refused for every caller");
    }

    let classifier = Classifier::new(&config.classifier);
    let llm_enabled = classifier.is_enabled();
    let app = api::router(AppState::new(db, classifier, config.admin_tokens));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    info!(addr = %config.bind, llm_enabled, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
