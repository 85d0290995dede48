mod apply;
mod config;
mod errors;
mod ingest;
mod matching;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::apply::controller::AutoApplyController;
use crate::apply::webdriver::WebDriverFormDriver;
use crate::config::Config;
use crate::ingest::resume::DocumentResumeExtractor;
use crate::ingest::scraper::{HttpJobSource, JobSource, UnconfiguredJobSource};
use crate::ingest::Workspace;
use crate::matching::engine::MatchingEngine;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting autoapply v{}", env!("CARGO_PKG_VERSION"));

    // Browser automation backend. The WebDriver session itself is opened lazily
    // on the first application, so startup does not need a running browser.
    let driver = Arc::new(WebDriverFormDriver::new(
        config.webdriver_url.clone(),
        config.webdriver_headless,
        config.driver_max_retries,
    )?);
    info!("WebDriver endpoint: {}", config.webdriver_url);

    let controller = AutoApplyController::spawn(driver.clone(), config.apply_settings());

    let job_source: Arc<dyn JobSource> = match &config.job_feed_url {
        Some(url) => {
            info!("Job feed: {url}");
            Arc::new(HttpJobSource::new(url.clone())?)
        }
        None => {
            warn!("JOB_FEED_URL not set; scraping disabled, ingest records via POST /api/v1/jobs");
            Arc::new(UnconfiguredJobSource)
        }
    };

    // Build app state
    let state = AppState {
        engine: MatchingEngine::new(config.match_settings()),
        config: config.clone(),
        workspace: Arc::new(RwLock::new(Workspace::default())),
        controller,
        extractor: Arc::new(DocumentResumeExtractor),
        job_source,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once a UI host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    driver.close().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
    }
}
