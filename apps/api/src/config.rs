use std::time::Duration;

use anyhow::{Context, Result};

use crate::apply::ApplySettings;
use crate::matching::engine::MatchSettings;

/// Application configuration loaded from environment variables.
/// Startup fails if a variable is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub webdriver_url: String,
    pub webdriver_headless: bool,
    /// Listing feed for the scrape endpoint; scraping is disabled when unset.
    pub job_feed_url: Option<String>,
    pub default_score_threshold: f64,
    pub max_applications: usize,
    pub detection_window_secs: u64,
    pub detection_poll_ms: u64,
    pub submit_ack_polls: u32,
    pub max_form_steps: usize,
    pub driver_max_retries: u32,
    pub min_document_frequency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let default_score_threshold: f64 = parse_env("DEFAULT_SCORE_THRESHOLD", 0.6)?;
        if !(0.0..=1.0).contains(&default_score_threshold) {
            anyhow::bail!("DEFAULT_SCORE_THRESHOLD must be within [0, 1]");
        }

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            webdriver_url: std::env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:4444".to_string()),
            webdriver_headless: parse_env("WEBDRIVER_HEADLESS", true)?,
            job_feed_url: std::env::var("JOB_FEED_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            default_score_threshold,
            max_applications: parse_env("MAX_APPLICATIONS", 10)?,
            detection_window_secs: parse_env("DETECTION_WINDOW_SECS", 10)?,
            detection_poll_ms: parse_env("DETECTION_POLL_MS", 500)?,
            submit_ack_polls: parse_env("SUBMIT_ACK_POLLS", 5)?,
            max_form_steps: parse_env("MAX_FORM_STEPS", 10)?,
            driver_max_retries: parse_env("DRIVER_MAX_RETRIES", 3)?,
            min_document_frequency: parse_env("MIN_DOCUMENT_FREQUENCY", 1)?,
        })
    }

    pub fn apply_settings(&self) -> ApplySettings {
        ApplySettings {
            default_threshold: self.default_score_threshold,
            max_applications: self.max_applications,
            detection_window: Duration::from_secs(self.detection_window_secs),
            poll_interval: Duration::from_millis(self.detection_poll_ms.max(1)),
            submit_ack_polls: self.submit_ack_polls,
            max_form_steps: self.max_form_steps,
        }
    }

    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            min_document_frequency: self.min_document_frequency,
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
