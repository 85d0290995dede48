pub mod handlers;
pub mod jobs;
pub mod resume;
pub mod scraper;

use std::sync::Arc;

use crate::ingest::jobs::PostingCatalog;
use crate::ingest::resume::UploadedResume;

/// Current resume and the posting catalog shared by the HTTP handlers.
///
/// A new upload replaces `resume` wholesale; runs already in flight keep
/// their own `Arc` to the profile they started with.
#[derive(Debug, Default)]
pub struct Workspace {
    pub resume: Option<Arc<UploadedResume>>,
    pub catalog: PostingCatalog,
}
