pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::apply::handlers as apply;
use crate::ingest::handlers as ingest;
use crate::matching::handlers as matching;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Ingestion
        .route(
            "/api/v1/resume",
            post(ingest::handle_upload_resume).get(ingest::handle_get_resume),
        )
        .route(
            "/api/v1/jobs",
            post(ingest::handle_ingest_jobs).get(ingest::handle_list_jobs),
        )
        .route("/api/v1/jobs/scrape", post(ingest::handle_scrape_jobs))
        // Matching
        .route("/api/v1/match", post(matching::handle_match))
        // Auto-apply run control
        .route("/api/v1/apply/start", post(apply::handle_start))
        .route("/api/v1/apply/pause", post(apply::handle_pause))
        .route("/api/v1/apply/resume", post(apply::handle_resume))
        .route("/api/v1/apply/cancel", post(apply::handle_cancel))
        .route("/api/v1/apply/answers", post(apply::handle_answers))
        .route("/api/v1/apply/status", get(apply::handle_status))
        .route("/api/v1/apply/ledger", get(apply::handle_ledger))
        .with_state(state)
}
