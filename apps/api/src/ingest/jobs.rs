//! Job Record Normalizer and the process-wide posting catalog.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::matching::skills::canonical_skills;
use crate::models::posting::{JobPosting, RawJobRecord};

const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_COMPANY: &str = "Unknown";
const UNTITLED_DESCRIPTION_WORDS: usize = 8;

/// Maps a raw record onto a `JobPosting`. Missing keys take defaults; this never fails.
///
/// Relative links are resolved against `site_base` (scheme + host of the
/// feed). The id is the link without query, fragment or trailing slash;
/// records with no usable link get a `untitled:` id built from title,
/// company and the opening words of the description, and an empty `apply_link`.
pub fn normalize_record(raw: RawJobRecord, site_base: Option<&str>) -> JobPosting {
    let title = non_blank(raw.title).unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    let company = non_blank(raw.company).unwrap_or_else(|| UNKNOWN_COMPANY.to_string());
    let location = non_blank(raw.location)
        .filter(|l| !matches!(l.to_lowercase().as_str(), "unknown" | "n/a" | "na"))
        .unwrap_or_default();

    let apply_link = non_blank(raw.link)
        .and_then(|link| absolute_link(&link, site_base))
        .unwrap_or_default();

    let description_text = [raw.description, raw.summary]
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let id = if apply_link.is_empty() {
        untitled_id(&title, &company, &description_text)
    } else {
        link_id(&apply_link)
    };

    JobPosting {
        id,
        title,
        company,
        location,
        description_text,
        required_skills: canonical_skills(raw.key_skills),
        is_easy_apply: raw.easy_apply.unwrap_or(true),
        apply_link,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn absolute_link(link: &str, site_base: Option<&str>) -> Option<String> {
    if link.starts_with("http://") || link.starts_with("https://") {
        return Some(link.to_string());
    }
    if let Some(rest) = link.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    let base = site_base?.trim_end_matches('/');
    Some(format!("{base}/{}", link.trim_start_matches('/')))
}

fn link_id(link: &str) -> String {
    link.split(['?', '#'])
        .next()
        .unwrap_or(link)
        .trim_end_matches('/')
        .to_string()
}

/// Same title and company with different descriptions stay distinct.
fn untitled_id(title: &str, company: &str, description: &str) -> String {
    let mut id = format!("untitled:{}@{}", slug(title), slug(company));
    let opening: Vec<&str> = description
        .split_whitespace()
        .take(UNTITLED_DESCRIPTION_WORDS)
        .collect();
    let opening = slug(&opening.join(" "));
    if !opening.is_empty() {
        id.push('#');
        id.push_str(&opening);
    }
    id
}

fn slug(value: &str) -> String {
    value
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Scheme and host of `url`, e.g. `https://jobs.example.com`.
pub fn site_base(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let host = rest.split(['/', '?', '#']).next().filter(|h| !h.is_empty())?;
    Some(format!("{scheme}://{host}"))
}

// ────────────────────────────────────────────────────────────────────────────
// Catalog
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogUpdate {
    pub added: usize,
    pub updated: usize,
    pub total: usize,
}

/// Postings deduplicated by id. On re-ingestion the display fields are
/// replaced by the newest record and required skills are unioned.
#[derive(Debug, Clone, Default)]
pub struct PostingCatalog {
    postings: BTreeMap<String, JobPosting>,
}

impl PostingCatalog {
    pub fn upsert(&mut self, posting: JobPosting) -> bool {
        match self.postings.get_mut(&posting.id) {
            Some(existing) => {
                let mut skills = std::mem::take(&mut existing.required_skills);
                skills.extend(posting.required_skills.iter().cloned());
                *existing = JobPosting {
                    required_skills: skills,
                    ..posting
                };
                false
            }
            None => {
                self.postings.insert(posting.id.clone(), posting);
                true
            }
        }
    }

    pub fn extend(&mut self, postings: impl IntoIterator<Item = JobPosting>) -> CatalogUpdate {
        let mut update = CatalogUpdate::default();
        for posting in postings {
            if self.upsert(posting) {
                update.added += 1;
            } else {
                update.updated += 1;
            }
        }
        update.total = self.postings.len();
        update
    }

    pub fn get(&self, id: &str) -> Option<&JobPosting> {
        self.postings.get(id)
    }

    /// All postings, ordered by id.
    pub fn postings(&self) -> Vec<JobPosting> {
        self.postings.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn clear(&mut self) {
        self.postings.clear();
    }
}
