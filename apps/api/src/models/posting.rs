use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A job record exactly as the scraping collaborator produced it.
/// Missing keys deserialize to `None`/empty rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawJobRecord {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "apply_link", alias = "url")]
    pub link: Option<String>,
    #[serde(alias = "skills")]
    pub key_skills: Vec<String>,
    pub easy_apply: Option<bool>,
}

/// Normalized, immutable job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    /// Derived from the source link; unique within a catalog.
    pub id: String,
    pub title: String,
    pub company: String,
    /// Empty when unknown.
    pub location: String,
    pub description_text: String,
    /// Canonical skill names; empty when the source listed none.
    pub required_skills: BTreeSet<String>,
    pub is_easy_apply: bool,
    /// Empty when the source had no usable link.
    pub apply_link: String,
}
