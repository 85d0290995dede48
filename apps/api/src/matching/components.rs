//! Individual scoring components. Each returns a value in [0, 1] and has a
//! defined fallback for missing input instead of an error.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::matching::text::{content_tokens, padded_phrase, tokenize};

/// Neutral score used when either side of a location comparison is unknown.
pub const LOCATION_UNKNOWN: f64 = 0.5;
/// Score for locations that share a region token or involve remote work.
pub const LOCATION_SAME_REGION: f64 = 0.5;

const CITY_ALIASES: &[(&str, &[&str])] = &[
    ("bangalore", &["bengaluru", "blore"]),
    ("mumbai", &["bombay"]),
    ("kolkata", &["calcutta"]),
    ("chennai", &["madras"]),
    ("delhi", &["new delhi", "ncr"]),
    ("gurgaon", &["gurugram"]),
];

static REQUIRED_YEARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
        (?:minimum|min\.?|at\s+least)\s+(?:of\s+)?(?P<min>\d+(?:\.\d+)?)\s*\+?\s*(?:years?|yrs?)
        | (?P<lo>\d+(?:\.\d+)?)\s*(?:-|–|to)\s*\d+(?:\.\d+)?\s*\+?\s*(?:years?|yrs?)
        | (?P<plus>\d+(?:\.\d+)?)\s*\+\s*(?:years?|yrs?)
        | (?P<bare>\d+(?:\.\d+)?)\s*(?:years?|yrs?)\s+(?:of\s+)?(?:relevant\s+|professional\s+|industry\s+|work\s+)?(?:experience|exp\b)
        ",
    )
    .expect("required-years pattern is valid")
});

/// `|profile ∩ required| / max(1, |required|)`; zero when nothing is required.
pub fn skill_match(profile_skills: &BTreeSet<String>, required: &BTreeSet<String>) -> f64 {
    if required.is_empty() {
        return 0.0;
    }
    let overlap = required.intersection(profile_skills).count();
    overlap as f64 / required.len().max(1) as f64
}

/// First required-years figure stated in `description`, e.g. `3+ years`,
/// `5-7 years` (lower bound), `at least 4 years`, `2 years of experience`.
pub fn required_years(description: &str) -> Option<f64> {
    let captures = REQUIRED_YEARS.captures(description)?;
    ["min", "lo", "plus", "bare"]
        .iter()
        .find_map(|name| captures.name(name))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|years| *years > 0.0)
}

/// `min(1, experience / required)`; a posting that states no requirement is satisfied.
pub fn experience_match(experience_years: f64, description: &str) -> f64 {
    match required_years(description) {
        None => 1.0,
        Some(required) => (experience_years.max(0.0) / required).min(1.0),
    }
}

/// 1.0 on exact or substring match, 0.5 on a shared region token or remote,
/// 0.5 when either side is unknown, else 0.0.
pub fn location_match(profile_location: &str, posting_location: &str) -> f64 {
    let profile = canonical_location(profile_location);
    let posting = canonical_location(posting_location);
    if profile.trim().is_empty() || posting.trim().is_empty() {
        return LOCATION_UNKNOWN;
    }

    if profile == posting || profile.contains(&posting) || posting.contains(&profile) {
        return 1.0;
    }

    let profile_tokens: HashSet<&str> = profile.split_whitespace().collect();
    let posting_tokens: HashSet<&str> = posting.split_whitespace().collect();
    let remote = profile_tokens.contains("remote") || posting_tokens.contains("remote");
    if remote || !profile_tokens.is_disjoint(&posting_tokens) {
        LOCATION_SAME_REGION
    } else {
        0.0
    }
}

/// Best overlap between any profile title and the posting title, as the
/// fraction of the posting title's meaningful tokens the profile title covers.
pub fn title_relevance(profile_titles: &[String], posting_title: &str) -> f64 {
    let wanted: BTreeSet<String> = content_tokens(posting_title).into_iter().collect();
    if wanted.is_empty() {
        return 0.0;
    }

    profile_titles
        .iter()
        .map(|title| {
            let have: BTreeSet<String> = content_tokens(title).into_iter().collect();
            wanted.intersection(&have).count() as f64 / wanted.len() as f64
        })
        .fold(0.0, f64::max)
}

/// Padded token string with city aliases collapsed onto one name.
fn canonical_location(location: &str) -> String {
    let mut padded = padded_phrase(location);
    for (city, aliases) in CITY_ALIASES {
        for alias in *aliases {
            let needle = format!(" {} ", tokenize(alias).join(" "));
            if padded.contains(&needle) {
                padded = padded.replace(&needle, &format!(" {city} "));
            }
        }
    }
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_skill_match_ratio() {
        let profile = set(&["python", "sql"]);
        let required = set(&["python", "sql", "amazon web services"]);
        assert!((skill_match(&profile, &required) - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_skill_match_empty_required_is_zero() {
        assert_eq!(skill_match(&set(&["python"]), &BTreeSet::new()), 0.0);
    }

    #[test]
    fn test_skill_match_is_monotonic_in_overlap() {
        let required = set(&["python", "sql", "docker", "kafka"]);
        let mut profile = BTreeSet::new();
        let mut last = skill_match(&profile, &required);
        for skill in ["python", "sql", "docker", "kafka", "rust"] {
            profile.insert(skill.to_string());
            let next = skill_match(&profile, &required);
            assert!(next >= last, "{next} < {last} after adding {skill}");
            last = next;
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn test_required_years_patterns() {
        assert_eq!(required_years("Need 3+ years with Python"), Some(3.0));
        assert_eq!(required_years("5-7 years of backend work"), Some(5.0));
        assert_eq!(required_years("2 to 4 yrs experience"), Some(2.0));
        assert_eq!(required_years("at least 4 years in the field"), Some(4.0));
        assert_eq!(required_years("Minimum 6 years"), Some(6.0));
        assert_eq!(required_years("2 years of professional experience"), Some(2.0));
        assert_eq!(required_years("Founded 12 years ago, we build tools"), None);
        assert_eq!(required_years(""), None);
    }

    #[test]
    fn test_experience_match_absent_requirement_is_satisfied() {
        assert_eq!(experience_match(0.0, "Great team, flexible hours"), 1.0);
    }

    #[test]
    fn test_experience_match_partial_and_capped() {
        assert!((experience_match(3.0, "6+ years required") - 0.5).abs() < 1e-9);
        assert_eq!(experience_match(10.0, "3+ years required"), 1.0);
    }

    #[test]
    fn test_location_match_exact_and_substring() {
        assert_eq!(location_match("Bangalore", "bangalore"), 1.0);
        assert_eq!(location_match("Bangalore", "Bangalore, Karnataka"), 1.0);
        assert_eq!(location_match("Bengaluru", "Bangalore"), 1.0);
    }

    #[test]
    fn test_location_match_region_and_remote() {
        assert_eq!(location_match("Pune, India", "Mumbai, India"), 0.5);
        assert_eq!(location_match("Chicago", "Remote"), 0.5);
        assert_eq!(location_match("Chicago", "Berlin"), 0.0);
    }

    #[test]
    fn test_location_match_unknown_side_is_neutral() {
        assert_eq!(location_match("", "Berlin"), 0.5);
        assert_eq!(location_match("Berlin", "   "), 0.5);
    }

    #[test]
    fn test_location_substring_respects_token_boundaries() {
        assert_eq!(location_match("Ind", "Indiana"), 0.0);
    }

    #[test]
    fn test_title_relevance_best_match() {
        let titles = vec!["Java Developer".to_string(), "Data Engineer".to_string()];
        assert_eq!(title_relevance(&titles, "Data Engineer"), 1.0);
        assert!((title_relevance(&titles, "Senior Data Engineer") - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(title_relevance(&titles, "Barista"), 0.0);
    }

    #[test]
    fn test_title_relevance_empty_inputs() {
        assert_eq!(title_relevance(&[], "Data Engineer"), 0.0);
        assert_eq!(title_relevance(&["Engineer".to_string()], ""), 0.0);
    }
}
