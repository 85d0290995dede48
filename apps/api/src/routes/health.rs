use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service version plus the current auto-apply phase.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let run = state.controller.status();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "autoapply",
        "auto_apply": run.phase,
        "scraping_enabled": state.config.job_feed_url.is_some(),
    }))
}
