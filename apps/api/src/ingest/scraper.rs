//! Scraping collaborator: fetches raw job records from a listing feed.
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::ingest::jobs::site_base;
use crate::models::posting::RawJobRecord;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("listing feed rejected credentials (status {0})")]
    Auth(u16),

    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("listing feed returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode listing payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no job feed configured")]
    NotConfigured,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    pub query: String,
    pub location: String,
    pub pages: Option<u32>,
}

/// Raw records plus the site base used to resolve their relative links.
#[derive(Debug, Clone, Default)]
pub struct ScrapeBatch {
    pub records: Vec<RawJobRecord>,
    pub site_base: Option<String>,
}

#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch(&self, criteria: &SearchCriteria) -> Result<ScrapeBatch, ScrapeError>;
}

/// Used when no feed is configured; every fetch fails with `NotConfigured`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredJobSource;

#[async_trait]
impl JobSource for UnconfiguredJobSource {
    async fn fetch(&self, _criteria: &SearchCriteria) -> Result<ScrapeBatch, ScrapeError> {
        Err(ScrapeError::NotConfigured)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedPayload {
    Records(Vec<RawJobRecord>),
    Wrapped { jobs: Vec<RawJobRecord> },
}

impl FeedPayload {
    fn into_records(self) -> Vec<RawJobRecord> {
        match self {
            FeedPayload::Records(records) | FeedPayload::Wrapped { jobs: records } => records,
        }
    }
}

/// JSON listing feed over HTTP. Retries 429 and 5xx with exponential backoff.
#[derive(Clone)]
pub struct HttpJobSource {
    client: Client,
    feed_url: String,
}

impl HttpJobSource {
    pub fn new(feed_url: String) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client, feed_url })
    }
}

#[async_trait]
impl JobSource for HttpJobSource {
    async fn fetch(&self, criteria: &SearchCriteria) -> Result<ScrapeBatch, ScrapeError> {
        let mut query: Vec<(&str, String)> = vec![
            ("query", criteria.query.clone()),
            ("location", criteria.location.clone()),
        ];
        if let Some(pages) = criteria.pages {
            query.push(("pages", pages.to_string()));
        }

        let mut last_error: Option<ScrapeError> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Job feed attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.get(&self.feed_url).query(&query).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ScrapeError::Network(e));
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                last_error = Some(ScrapeError::RateLimited { retries: attempt });
                continue;
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Job feed returned {}: {}", status, body);
                last_error = Some(ScrapeError::Status {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(ScrapeError::Auth(status.as_u16()));
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ScrapeError::Status {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let body = response.bytes().await?;
            let records = parse_feed(&body)?;
            debug!(records = records.len(), "job feed fetched");

            return Ok(ScrapeBatch {
                records,
                site_base: site_base(&self.feed_url),
            });
        }

        Err(last_error.unwrap_or(ScrapeError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// Accepts either a bare array of records or `{"jobs": [...]}`.
pub fn parse_feed(body: &[u8]) -> Result<Vec<RawJobRecord>, ScrapeError> {
    Ok(serde_json::from_slice::<FeedPayload>(body)?.into_records())
}
