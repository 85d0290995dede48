//! Resume ingestion: document bytes → structured fields → `ResumeProfile`.
//!
//! Extraction is rule-based. The uploaded document is kept in a temp file for
//! as long as the profile is current so the form driver can attach it.

use std::collections::{BTreeSet, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

use crate::matching::skills::{canonical_skills, extract_skills};
use crate::matching::text::tokenize;
use crate::models::profile::{ContactInfo, ParsedResume, ResumeProfile};

const MAX_TITLES: usize = 5;
const MAX_TITLE_WORDS: usize = 6;

const ROLE_WORDS: &[&str] = &[
    "administrator", "analyst", "architect", "consultant", "designer", "developer", "engineer",
    "intern", "lead", "manager", "programmer", "scientist", "specialist",
];

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email pattern is valid")
});

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\(?[0-9]{3}\)?[-\s.]?[0-9]{3}[-\s.]?[0-9]{4,6}").expect("phone pattern is valid")
});

static EXPERIENCE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(\d+(?:\.\d+)?)\+?\s*(?:years?|yrs?)\s*(?:of\s+)?(?:experience|work)",
        r"(?i)(?:experience|work)\s*(?:of\s+)?(\d+(?:\.\d+)?)\+?\s*(?:years?|yrs?)",
        r"(?i)(\d+(?:\.\d+)?)\+?\s*(?:years?|yrs?)\s+(?:in|of)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("experience pattern is valid"))
    .collect()
});

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:(?:location|address)\s*:\s*|(?:based|residing)\s+in\s+)([^,\n]+)")
        .expect("location pattern is valid")
});

static SKILLS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:technical\s+)?skills\s*:\s*(.+)$").expect("skills pattern is valid")
});

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("uploaded document is empty")]
    Empty,

    #[error("could not read PDF: {0}")]
    Pdf(String),

    #[error("document is neither PDF nor UTF-8 text")]
    Encoding,

    #[error("no text could be extracted from the document")]
    NoText,

    #[error("could not stage uploaded document: {0}")]
    Storage(#[from] std::io::Error),
}

/// Opaque "document → structured fields" collaborator.
pub trait ResumeExtractor: Send + Sync {
    fn extract(&self, document: &[u8]) -> Result<ParsedResume, ParseError>;
}

/// PDF (by `%PDF` magic) or UTF-8 text, followed by rule-based field extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentResumeExtractor;

impl ResumeExtractor for DocumentResumeExtractor {
    fn extract(&self, document: &[u8]) -> Result<ParsedResume, ParseError> {
        if document.is_empty() {
            return Err(ParseError::Empty);
        }

        let text = if document.starts_with(b"%PDF") {
            pdf_extract::extract_text_from_mem(document).map_err(|e| ParseError::Pdf(e.to_string()))?
        } else {
            String::from_utf8(document.to_vec()).map_err(|_| ParseError::Encoding)?
        };

        if text.trim().is_empty() {
            return Err(ParseError::NoText);
        }
        Ok(parse_resume_text(&text))
    }
}

/// Pulls contact details, experience, location, titles and skills out of plain text.
pub fn parse_resume_text(text: &str) -> ParsedResume {
    let experience_years = EXPERIENCE
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
        .fold(None, |best: Option<f64>, years| Some(best.map_or(years, |b| b.max(years))));

    let location = LOCATION
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().trim_end_matches('.').trim().to_string())
        .filter(|l| !l.is_empty());

    let mut skills: Vec<String> = extract_skills(text).into_iter().collect();
    for line in SKILLS_LINE.captures_iter(text) {
        if let Some(list) = line.get(1) {
            skills.extend(
                list.as_str()
                    .split([',', ';', '|', '•'])
                    .map(str::trim)
                    .filter(|s| !s.is_empty() && s.len() <= 40)
                    .map(String::from),
            );
        }
    }

    ParsedResume {
        skills,
        experience_years,
        titles: extract_titles(text),
        location,
        raw_text: text.to_string(),
        contact: ContactInfo {
            name: extract_name(text),
            email: EMAIL.find(text).map(|m| m.as_str().to_string()),
            phone: PHONE.find(text).map(|m| m.as_str().to_string()),
        },
    }
}

fn extract_titles(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut titles = Vec::new();

    for line in text.lines() {
        let head = line
            .split(" at ")
            .next()
            .and_then(|s| s.split([',', '|', '–', '(']).next())
            .and_then(|s| s.split(" - ").next())
            .unwrap_or_default()
            .trim()
            .trim_start_matches(['•', '-', '*'])
            .trim();

        let tokens = tokenize(head);
        if tokens.is_empty() || tokens.len() > MAX_TITLE_WORDS {
            continue;
        }
        if !tokens.iter().any(|t| ROLE_WORDS.contains(&t.as_str())) {
            continue;
        }
        if seen.insert(tokens.join(" ")) {
            titles.push(head.to_string());
        }
        if titles.len() == MAX_TITLES {
            break;
        }
    }
    titles
}

/// First non-empty line when it looks like a personal name (2 to 4 alphabetic words).
fn extract_name(text: &str) -> Option<String> {
    let first = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    let words: Vec<&str> = first.split_whitespace().collect();
    let looks_like_name = (2..=4).contains(&words.len())
        && words.iter().all(|w| {
            w.chars()
                .all(|c| c.is_alphabetic() || c == '.' || c == '-' || c == '\'')
        });
    looks_like_name.then(|| words.join(" "))
}

/// Normalizes extracted fields into a profile; absent values take defaults.
pub fn build_profile(parsed: ParsedResume) -> ResumeProfile {
    let mut seen = HashSet::new();
    let titles = parsed
        .titles
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .collect();

    let skills: BTreeSet<String> = canonical_skills(parsed.skills);

    ResumeProfile {
        skills,
        experience_years: parsed
            .experience_years
            .filter(|y| y.is_finite() && *y > 0.0)
            .unwrap_or(0.0),
        titles,
        location: parsed.location.unwrap_or_default().trim().to_string(),
        raw_text: parsed.raw_text,
        contact: ContactInfo {
            name: non_blank(parsed.contact.name),
            email: non_blank(parsed.contact.email),
            phone: non_blank(parsed.contact.phone),
        },
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Uploaded resume
// ────────────────────────────────────────────────────────────────────────────

/// The current profile plus the staged document it was built from.
/// Dropping it removes the temp file.
#[derive(Debug)]
pub struct UploadedResume {
    pub profile: ResumeProfile,
    pub file_name: String,
    document: Option<NamedTempFile>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumeView {
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub profile: ResumeProfile,
}

impl UploadedResume {
    /// A resume with no staged document (profile supplied directly).
    pub fn from_profile(profile: ResumeProfile) -> Self {
        Self {
            profile,
            file_name: String::new(),
            document: None,
            uploaded_at: Utc::now(),
        }
    }

    pub fn document_path(&self) -> Option<&Path> {
        self.document.as_ref().map(|f| f.path())
    }

    pub fn view(&self) -> ResumeView {
        ResumeView {
            file_name: self.file_name.clone(),
            uploaded_at: self.uploaded_at,
            profile: self.profile.clone(),
        }
    }
}

/// Extracts a profile from `document` and stages the bytes in a temp file.
/// Runs on the blocking pool; PDF extraction is CPU-bound.
pub async fn ingest_resume(
    extractor: Arc<dyn ResumeExtractor>,
    file_name: String,
    document: Bytes,
) -> Result<UploadedResume, ParseError> {
    tokio::task::spawn_blocking(move || -> Result<UploadedResume, ParseError> {
        let parsed = extractor.extract(&document)?;
        let profile = build_profile(parsed);

        let suffix = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let mut staged = tempfile::Builder::new()
            .prefix("resume-")
            .suffix(&suffix)
            .tempfile()?;
        staged.write_all(&document)?;
        staged.flush()?;

        info!(
            file_name = %file_name,
            skills = profile.skills.len(),
            experience_years = profile.experience_years,
            "resume ingested"
        );

        Ok(UploadedResume {
            profile,
            file_name,
            document: Some(staged),
            uploaded_at: Utc::now(),
        })
    })
    .await
    .map_err(|e| ParseError::Storage(std::io::Error::other(e)))?
}
