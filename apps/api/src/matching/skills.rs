//! Controlled skill vocabulary with alias expansion.
//!
//! Profile skills, normalized posting skills and skills extracted from free
//! text all pass through `canonical_skill`, so set intersection is the only
//! comparison the scorer needs.

use std::collections::BTreeSet;

use crate::matching::text::{padded_phrase, tokenize};

/// Canonical name → aliases that collapse onto it.
const SKILL_ALIASES: &[(&str, &[&str])] = &[
    ("javascript", &["js", "node.js", "nodejs", "node", "es6"]),
    ("typescript", &["ts"]),
    ("python", &["py", "python3", "python 3"]),
    ("machine learning", &["ml", "machine-learning", "machinelearning"]),
    ("artificial intelligence", &["ai", "artificial-intelligence"]),
    ("deep learning", &["dl", "deep-learning"]),
    ("amazon web services", &["aws", "amazon-web-services"]),
    ("google cloud", &["gcp", "google cloud platform"]),
    ("sql", &["mysql", "postgresql", "postgres", "oracle", "sqlserver", "sql server", "t-sql"]),
    ("version control", &["git", "github", "gitlab", "bitbucket"]),
    ("microsoft excel", &["ms excel", "excel"]),
    ("microsoft word", &["ms word", "word"]),
    ("microsoft office", &["ms office", "office", "microsoft-office"]),
    ("power bi", &["powerbi", "power-bi"]),
    ("business intelligence", &["bi", "business-intelligence"]),
    ("data analysis", &["data analytics", "data analyst"]),
    ("ci/cd", &["cicd", "continuous integration", "continuous delivery"]),
    ("kubernetes", &["k8s"]),
    ("scikit-learn", &["sklearn", "scikit learn"]),
    ("react", &["reactjs", "react.js"]),
    ("vue", &["vuejs", "vue.js"]),
    ("angular", &["angularjs"]),
    ("golang", &["go"]),
];

/// Canonical skills recognised in free text, in addition to alias keys.
const SKILL_VOCABULARY: &[&str] = &[
    "python", "java", "javascript", "typescript", "react", "angular", "vue", "sql", "mongodb",
    "amazon web services", "azure", "google cloud", "docker", "kubernetes", "version control",
    "jenkins", "agile", "scrum", "machine learning", "artificial intelligence", "data science",
    "deep learning", "pandas", "numpy", "tensorflow", "pytorch", "scikit-learn", "keras",
    "flask", "django", "fastapi", "spring", "selenium", "beautifulsoup", "scrapy", "html",
    "css", "bootstrap", "jquery", "php", "c++", "c#", ".net", "golang", "rust", "swift",
    "kotlin", "scala", "matlab", "tableau", "power bi", "microsoft excel", "powerpoint",
    "photoshop", "illustrator", "figma", "sketch", "hadoop", "spark", "kafka", "hive",
    "terraform", "ci/cd", "linux", "graphql", "redis", "rest", "microservices", "android",
    "ios", "flutter", "data analysis", "statistics", "nlp", "computer vision",
];

/// Aliases too common in ordinary prose to be trusted during free-text
/// extraction. They still canonicalize when listed explicitly as skills.
const AMBIGUOUS_IN_TEXT: &[&str] = &[
    "go", "word", "office", "bi", "dl", "py", "ts", "node", "ai", "ml", "oracle", "rest",
    "sketch", "spring", "swift",
];

/// Lower-cases, collapses whitespace and maps aliases onto their canonical name.
pub fn canonical_skill(raw: &str) -> String {
    let cleaned = raw
        .trim()
        .trim_start_matches([',', ';'])
        .trim_end_matches([',', ';', '.'])
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    for (canonical, aliases) in SKILL_ALIASES {
        if cleaned == *canonical || aliases.contains(&cleaned.as_str()) {
            return (*canonical).to_string();
        }
    }
    cleaned
}

/// Canonicalizes a list of skills into a deduplicated set, dropping blanks.
pub fn canonical_skills<I, S>(skills: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    skills
        .into_iter()
        .map(|s| canonical_skill(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extracts vocabulary skills mentioned anywhere in `text`.
///
/// Matching is whole-token (so `java` does not fire on `javascript`).
/// Text with no vocabulary hits yields an empty set.
pub fn extract_skills(text: &str) -> BTreeSet<String> {
    let haystack = padded_phrase(text);
    let mut found = BTreeSet::new();

    let alias_terms = SKILL_ALIASES
        .iter()
        .flat_map(|(canonical, aliases)| std::iter::once(*canonical).chain(aliases.iter().copied()));

    for term in SKILL_VOCABULARY.iter().copied().chain(alias_terms) {
        if AMBIGUOUS_IN_TEXT.contains(&term) {
            continue;
        }
        let needle = format!(" {} ", tokenize(term).join(" "));
        if needle.trim().is_empty() {
            continue;
        }
        if haystack.contains(&needle) {
            found.insert(canonical_skill(term));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_skill_maps_aliases() {
        assert_eq!(canonical_skill("AWS"), "amazon web services");
        assert_eq!(canonical_skill(" PostgreSQL "), "sql");
        assert_eq!(canonical_skill("Node.js"), "javascript");
        assert_eq!(canonical_skill("Machine   Learning"), "machine learning");
        assert_eq!(canonical_skill("Rust"), "rust");
    }

    #[test]
    fn test_canonical_skills_dedupes_and_drops_blanks() {
        let set = canonical_skills(["Python", "python3", "", "  ", "SQL", "mysql"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("python"));
        assert!(set.contains("sql"));
    }

    #[test]
    fn test_extract_skills_is_whole_token() {
        let skills = extract_skills("We use JavaScript and TypeScript daily.");
        assert!(skills.contains("javascript"));
        assert!(skills.contains("typescript"));
        assert!(!skills.contains("java"));
    }

    #[test]
    fn test_extract_skills_finds_phrases_and_aliases() {
        let skills = extract_skills("Experience with machine learning on AWS, plus C++ and K8s.");
        assert!(skills.contains("machine learning"));
        assert!(skills.contains("amazon web services"));
        assert!(skills.contains("c++"));
        assert!(skills.contains("kubernetes"));
    }

    #[test]
    fn test_extract_skills_ignores_ambiguous_prose() {
        let skills = extract_skills("Go to the office and put in a good word.");
        assert!(skills.is_empty(), "unexpected skills: {skills:?}");
    }

    #[test]
    fn test_extract_skills_unmatched_vocabulary_is_empty() {
        assert!(extract_skills("Friendly barista wanted for weekend shifts").is_empty());
        assert!(extract_skills("").is_empty());
    }
}
