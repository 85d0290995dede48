use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;

use crate::apply::controller::AutoApplyController;
use crate::config::Config;
use crate::errors::AppError;
use crate::ingest::resume::ResumeExtractor;
use crate::ingest::scraper::JobSource;
use crate::ingest::Workspace;
use crate::matching::engine::MatchingEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Current resume and posting catalog. Guards are never held across `.await`.
    pub workspace: Arc<RwLock<Workspace>>,
    pub engine: MatchingEngine,
    pub controller: AutoApplyController,
    /// Pluggable collaborators. Defaults: `DocumentResumeExtractor`, `HttpJobSource`.
    pub extractor: Arc<dyn ResumeExtractor>,
    pub job_source: Arc<dyn JobSource>,
}

impl AppState {
    pub fn workspace(&self) -> Result<RwLockReadGuard<'_, Workspace>, AppError> {
        self.workspace
            .read()
            .map_err(|_| AppError::Internal(anyhow!("workspace lock poisoned")))
    }

    pub fn workspace_mut(&self) -> Result<RwLockWriteGuard<'_, Workspace>, AppError> {
        self.workspace
            .write()
            .map_err(|_| AppError::Internal(anyhow!("workspace lock poisoned")))
    }
}
