use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::ingest::jobs::{normalize_record, CatalogUpdate};
use crate::ingest::resume::{ingest_resume, ResumeView};
use crate::ingest::scraper::SearchCriteria;
use crate::models::posting::{JobPosting, RawJobRecord};
use crate::state::AppState;

const RESUME_FIELD: &str = "file";

#[derive(Deserialize)]
pub struct IngestJobsRequest {
    pub records: Vec<RawJobRecord>,
    /// Scheme and host used to resolve relative links.
    #[serde(default)]
    pub site_base: Option<String>,
}

#[derive(Serialize)]
pub struct JobListResponse {
    pub total: usize,
    pub postings: Vec<JobPosting>,
}

#[derive(Serialize)]
pub struct ScrapeResponse {
    pub fetched: usize,
    #[serde(flatten)]
    pub catalog: CatalogUpdate,
}

/// POST /api/v1/resume
/// Multipart upload; the `file` part is parsed and replaces the current resume.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeView>), AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("resume").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) = upload.ok_or_else(|| {
        AppError::Validation(format!("multipart field '{RESUME_FIELD}' is required"))
    })?;

    let uploaded = ingest_resume(state.extractor.clone(), file_name, bytes).await?;
    let view = uploaded.view();
    state.workspace_mut()?.resume = Some(Arc::new(uploaded));

    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/resume
pub async fn handle_get_resume(
    State(state): State<AppState>,
) -> Result<Json<ResumeView>, AppError> {
    let workspace = state.workspace()?;
    let resume = workspace
        .resume
        .as_ref()
        .ok_or_else(|| AppError::NotFound("No resume has been uploaded".to_string()))?;
    Ok(Json(resume.view()))
}

/// POST /api/v1/jobs
pub async fn handle_ingest_jobs(
    State(state): State<AppState>,
    Json(req): Json<IngestJobsRequest>,
) -> Result<Json<CatalogUpdate>, AppError> {
    let site_base = req.site_base.as_deref();
    let postings: Vec<JobPosting> = req
        .records
        .into_iter()
        .map(|raw| normalize_record(raw, site_base))
        .collect();

    let update = state.workspace_mut()?.catalog.extend(postings);
    info!(added = update.added, updated = update.updated, "job records ingested");
    Ok(Json(update))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<JobListResponse>, AppError> {
    let postings = state.workspace()?.catalog.postings();
    Ok(Json(JobListResponse {
        total: postings.len(),
        postings,
    }))
}

/// POST /api/v1/jobs/scrape
/// On failure the catalog keeps whatever was already fetched.
pub async fn handle_scrape_jobs(
    State(state): State<AppState>,
    Json(criteria): Json<SearchCriteria>,
) -> Result<Json<ScrapeResponse>, AppError> {
    let batch = state.job_source.fetch(&criteria).await?;
    let fetched = batch.records.len();
    let site_base = batch.site_base.as_deref();
    let postings: Vec<JobPosting> = batch
        .records
        .into_iter()
        .map(|raw| normalize_record(raw, site_base))
        .collect();

    let catalog = state.workspace_mut()?.catalog.extend(postings);
    info!(fetched, added = catalog.added, query = %criteria.query, "scrape completed");
    Ok(Json(ScrapeResponse { fetched, catalog }))
}
