use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::ingest::jobs::normalize_record;
use crate::ingest::resume::UploadedResume;
use crate::matching::engine::{MatchResult, Ranking};
use crate::models::posting::{JobPosting, RawJobRecord};
use crate::state::AppState;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct MatchRequest {
    /// Rank these records instead of the catalog.
    pub records: Option<Vec<RawJobRecord>>,
    pub top_n: Option<usize>,
    pub min_score: Option<f64>,
}

#[derive(Serialize)]
pub struct RankedPosting {
    #[serde(flatten)]
    pub result: MatchResult,
    pub title: String,
    pub company: String,
    pub location: String,
    pub apply_link: String,
    pub is_easy_apply: bool,
}

#[derive(Serialize)]
pub struct MatchResponse {
    pub total: usize,
    pub degraded: usize,
    pub results: Vec<RankedPosting>,
}

/// Current resume plus the postings to rank. Neither is borrowed from the
/// workspace, so ranking runs without holding its lock.
pub fn ranking_inputs(
    state: &AppState,
    records: Option<Vec<RawJobRecord>>,
) -> Result<(Arc<UploadedResume>, Vec<JobPosting>), AppError> {
    let workspace = state.workspace()?;
    let resume = workspace
        .resume
        .clone()
        .ok_or_else(|| AppError::NotFound("Upload a resume before matching".to_string()))?;
    let postings = match records {
        Some(records) => records
            .into_iter()
            .map(|raw| normalize_record(raw, None))
            .collect(),
        None => workspace.catalog.postings(),
    };
    Ok((resume, postings))
}

/// Joins ranked results back onto their postings, in rank order.
pub fn attach_postings(ranking: Ranking, postings: Vec<JobPosting>) -> Vec<(JobPosting, MatchResult)> {
    let mut by_id: HashMap<String, JobPosting> =
        postings.into_iter().map(|p| (p.id.clone(), p)).collect();
    ranking
        .results
        .into_iter()
        .filter_map(|result| by_id.remove(&result.job_id).map(|posting| (posting, result)))
        .collect()
}

/// POST /api/v1/match
pub async fn handle_match(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    if let Some(min) = req.min_score {
        if !(0.0..=1.0).contains(&min) {
            return Err(AppError::Validation("min_score must be within [0, 1]".to_string()));
        }
    }

    let (resume, postings) = ranking_inputs(&state, req.records)?;
    let ranking = state.engine.rank(&resume.profile, &postings);
    let total = ranking.results.len();
    let degraded = ranking.degraded;

    let keep: Vec<String> = ranking
        .top(req.top_n, req.min_score.unwrap_or(0.0))
        .into_iter()
        .map(|r| r.job_id.clone())
        .collect();

    let results = attach_postings(ranking, postings)
        .into_iter()
        .filter(|(posting, _)| keep.contains(&posting.id))
        .map(|(posting, result)| RankedPosting {
            result,
            title: posting.title,
            company: posting.company,
            location: posting.location,
            apply_link: posting.apply_link,
            is_easy_apply: posting.is_easy_apply,
        })
        .collect();

    Ok(Json(MatchResponse {
        total,
        degraded,
        results,
    }))
}
