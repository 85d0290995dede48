use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::apply::controller::{RankedJob, RunSnapshot, RunTicket};
use crate::apply::ledger::{LedgerSummary, OutcomeLedger, OutcomeRecord};
use crate::errors::AppError;
use crate::matching::handlers::{attach_postings, ranking_inputs};
use crate::state::AppState;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct StartRequest {
    pub threshold: Option<f64>,
}

#[derive(Deserialize)]
pub struct AnswersRequest {
    pub job_id: String,
    pub answers: BTreeMap<String, String>,
}

#[derive(Serialize)]
pub struct LedgerResponse {
    pub summary: LedgerSummary,
    pub recent: Vec<OutcomeRecord>,
    pub ledger: OutcomeLedger,
}

/// POST /api/v1/apply/start
/// Ranks the catalog against the current resume and starts a run.
pub async fn handle_start(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<(StatusCode, Json<RunTicket>), AppError> {
    let threshold = req
        .threshold
        .unwrap_or(state.controller.settings().default_threshold);
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(AppError::Validation("threshold must be within [0, 1]".to_string()));
    }

    let (resume, postings) = ranking_inputs(&state, None)?;
    let ranking = state.engine.rank(&resume.profile, &postings);
    let ranked: Vec<RankedJob> = attach_postings(ranking, postings)
        .into_iter()
        .map(|(posting, result)| RankedJob { posting, result })
        .collect();

    let ticket = state.controller.start(ranked, resume, threshold)?;
    Ok((StatusCode::ACCEPTED, Json(ticket)))
}

/// POST /api/v1/apply/pause
pub async fn handle_pause(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.controller.pause()?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/v1/apply/resume
pub async fn handle_resume(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.controller.resume()?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/v1/apply/cancel
pub async fn handle_cancel(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.controller.cancel()?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/v1/apply/answers
/// Safe to retry: answers for questions already answered are ignored.
pub async fn handle_answers(
    State(state): State<AppState>,
    Json(req): Json<AnswersRequest>,
) -> Result<StatusCode, AppError> {
    if req.job_id.trim().is_empty() {
        return Err(AppError::Validation("job_id is required".to_string()));
    }
    if req.answers.is_empty() {
        return Err(AppError::Validation("answers must not be empty".to_string()));
    }
    state.controller.submit_answers(req.job_id, req.answers)?;
    Ok(StatusCode::ACCEPTED)
}

/// GET /api/v1/apply/status
pub async fn handle_status(State(state): State<AppState>) -> Json<RunSnapshot> {
    Json(state.controller.status())
}

/// GET /api/v1/apply/ledger
pub async fn handle_ledger(State(state): State<AppState>) -> Json<LedgerResponse> {
    let ledger = state.controller.ledger_snapshot();
    Json(LedgerResponse {
        summary: ledger.summary(),
        recent: ledger.recent().cloned().collect(),
        ledger,
    })
}
