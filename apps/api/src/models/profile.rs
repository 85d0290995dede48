use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Contact details used to populate the known fields of an application form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Structured fields returned by the resume ingestion collaborator.
///
/// Every field is optional on the wire; absent values fall back to defaults
/// when the profile is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedResume {
    pub skills: Vec<String>,
    pub experience_years: Option<f64>,
    pub titles: Vec<String>,
    pub location: Option<String>,
    pub raw_text: String,
    pub contact: ContactInfo,
}

/// Normalized candidate profile. Built once per upload and never mutated;
/// a new upload supersedes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeProfile {
    /// Canonical, lower-cased skill names.
    pub skills: BTreeSet<String>,
    pub experience_years: f64,
    /// Titles in first-seen order.
    pub titles: Vec<String>,
    /// Empty when unknown.
    pub location: String,
    pub raw_text: String,
    pub contact: ContactInfo,
}
