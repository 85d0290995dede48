//! Matching Engine: ranks postings against one resume profile.
//!
//! Pure and deterministic: no I/O, no shared state. Every component has a
//! fallback value, so ranking never fails; postings that needed a fallback
//! are counted in `Ranking::degraded`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matching::components::{
    experience_match, location_match, skill_match, title_relevance,
};
use crate::matching::skills::extract_skills;
use crate::matching::text::content_tokens;
use crate::matching::tfidf::{cosine_similarity, TermVector, TfIdfSpace};
use crate::models::posting::JobPosting;
use crate::models::profile::ResumeProfile;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreComponent {
    TextSimilarity,
    SkillMatch,
    ExperienceMatch,
    LocationMatch,
    TitleRelevance,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub text_similarity: f64,
    pub skill_match: f64,
    pub experience_match: f64,
    pub location_match: f64,
    pub title_relevance: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            text_similarity: 0.30,
            skill_match: 0.35,
            experience_match: 0.20,
            location_match: 0.10,
            title_relevance: 0.05,
        }
    }
}

impl MatchWeights {
    /// `Σ weight_i × component_i`, clamped to [0, 1].
    pub fn combine(&self, scores: &ComponentScores) -> f64 {
        (self.text_similarity * scores.text_similarity
            + self.skill_match * scores.skill_match
            + self.experience_match * scores.experience_match
            + self.location_match * scores.location_match
            + self.title_relevance * scores.title_relevance)
            .clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub text_similarity: f64,
    pub skill_match: f64,
    pub experience_match: f64,
    pub location_match: f64,
    pub title_relevance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub job_id: String,
    pub components: ComponentScores,
    pub final_score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    /// Components whose fallback value was used for this posting.
    pub fallbacks: Vec<ScoreComponent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    /// Sorted by `final_score` descending, ties by `job_id` ascending.
    pub results: Vec<MatchResult>,
    /// Number of postings scored with at least one fallback.
    pub degraded: usize,
}

impl Ranking {
    /// Results at or above `min_score`, truncated to `top_n` when given.
    pub fn top(&self, top_n: Option<usize>, min_score: f64) -> Vec<&MatchResult> {
        self.results
            .iter()
            .filter(|r| r.final_score >= min_score)
            .take(top_n.unwrap_or(usize::MAX))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSettings {
    pub min_document_frequency: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            min_document_frequency: 1,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    settings: MatchSettings,
    weights: MatchWeights,
}

impl MatchingEngine {
    pub fn new(settings: MatchSettings) -> Self {
        Self {
            settings,
            weights: MatchWeights::default(),
        }
    }

    /// Scores every posting against `profile` and returns them ranked.
    ///
    /// Postings sharing an `id` are collapsed, last one wins.
    pub fn rank(&self, profile: &ResumeProfile, postings: &[JobPosting]) -> Ranking {
        let mut unique: BTreeMap<&str, &JobPosting> = BTreeMap::new();
        for posting in postings {
            unique.insert(posting.id.as_str(), posting);
        }

        let mut documents: Vec<&str> = Vec::with_capacity(unique.len() + 1);
        documents.push(profile.raw_text.as_str());
        documents.extend(unique.values().map(|p| p.description_text.as_str()));

        let space = TfIdfSpace::fit(&documents, self.settings.min_document_frequency);
        let resume_vector = space.vectorize(&profile.raw_text);

        let mut results: Vec<MatchResult> = unique
            .values()
            .map(|posting| self.score(profile, posting, &space, &resume_vector))
            .collect();

        results.sort_by(|a, b| {
            b.final_score
                .total_cmp(&a.final_score)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });

        let degraded = results.iter().filter(|r| !r.fallbacks.is_empty()).count();
        debug!(
            postings = results.len(),
            vocabulary = space.vocabulary_size(),
            degraded,
            "ranked postings"
        );

        Ranking { results, degraded }
    }

    fn score(
        &self,
        profile: &ResumeProfile,
        posting: &JobPosting,
        space: &TfIdfSpace,
        resume_vector: &TermVector,
    ) -> MatchResult {
        let mut fallbacks = Vec::new();

        let text_similarity =
            if profile.raw_text.trim().is_empty() || posting.description_text.trim().is_empty() {
                fallbacks.push(ScoreComponent::TextSimilarity);
                0.0
            } else {
                cosine_similarity(resume_vector, &space.vectorize(&posting.description_text))
            };

        let required: BTreeSet<String> = if posting.required_skills.is_empty() {
            extract_skills(&posting.description_text)
        } else {
            posting.required_skills.clone()
        };
        if required.is_empty() {
            fallbacks.push(ScoreComponent::SkillMatch);
        }
        let skill_score = skill_match(&profile.skills, &required);

        let experience_score = experience_match(profile.experience_years, &posting.description_text);

        if profile.location.trim().is_empty() || posting.location.trim().is_empty() {
            fallbacks.push(ScoreComponent::LocationMatch);
        }
        let location_score = location_match(&profile.location, &posting.location);

        if profile.titles.is_empty() || content_tokens(&posting.title).is_empty() {
            fallbacks.push(ScoreComponent::TitleRelevance);
        }
        let title_score = title_relevance(&profile.titles, &posting.title);

        let components = ComponentScores {
            text_similarity: sanitize(text_similarity, ScoreComponent::TextSimilarity, &mut fallbacks),
            skill_match: sanitize(skill_score, ScoreComponent::SkillMatch, &mut fallbacks),
            experience_match: sanitize(
                experience_score,
                ScoreComponent::ExperienceMatch,
                &mut fallbacks,
            ),
            location_match: sanitize(location_score, ScoreComponent::LocationMatch, &mut fallbacks),
            title_relevance: sanitize(title_score, ScoreComponent::TitleRelevance, &mut fallbacks),
        };

        let final_score = self.weights.combine(&components);

        let matched_skills = required.intersection(&profile.skills).cloned().collect();
        let missing_skills = required.difference(&profile.skills).cloned().collect();

        fallbacks.sort();
        fallbacks.dedup();

        MatchResult {
            job_id: posting.id.clone(),
            components,
            final_score,
            matched_skills,
            missing_skills,
            fallbacks,
        }
    }
}

/// Clamps to [0, 1]; a non-finite value becomes 0 and is recorded as a fallback.
fn sanitize(value: f64, component: ScoreComponent, fallbacks: &mut Vec<ScoreComponent>) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallbacks.push(component);
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(skills: &[&str], years: f64) -> ResumeProfile {
        ResumeProfile {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience_years: years,
            titles: vec!["Data Engineer".to_string()],
            location: "Remote".to_string(),
            raw_text: "Data engineer building Python and SQL pipelines for analytics teams"
                .to_string(),
            contact: Default::default(),
        }
    }

    fn posting(id: &str, title: &str, skills: &[&str], description: &str) -> JobPosting {
        JobPosting {
            id: id.to_string(),
            title: title.to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            description_text: description.to_string(),
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            is_easy_apply: true,
            apply_link: format!("https://jobs.example.com/{id}"),
        }
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = MatchWeights::default();
        let sum = w.text_similarity
            + w.skill_match
            + w.experience_match
            + w.location_match
            + w.title_relevance;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_final_score_bounded_for_any_normalized_weights() {
        let weight_sets = [
            [0.30, 0.35, 0.20, 0.10, 0.05],
            [1.0, 0.0, 0.0, 0.0, 0.0],
            [0.2, 0.2, 0.2, 0.2, 0.2],
            [0.0, 0.0, 0.0, 0.5, 0.5],
        ];
        let grid = [0.0, 0.25, 0.5, 1.0];
        for w in weight_sets {
            let weights = MatchWeights {
                text_similarity: w[0],
                skill_match: w[1],
                experience_match: w[2],
                location_match: w[3],
                title_relevance: w[4],
            };
            for a in grid {
                for b in grid {
                    let scores = ComponentScores {
                        text_similarity: a,
                        skill_match: b,
                        experience_match: a,
                        location_match: b,
                        title_relevance: a,
                    };
                    let score = weights.combine(&scores);
                    assert!((0.0..=1.0).contains(&score), "score {score} out of range");
                }
            }
        }
    }

    #[test]
    fn test_final_score_is_weighted_sum() {
        let scores = ComponentScores {
            text_similarity: 0.5,
            skill_match: 1.0,
            experience_match: 1.0,
            location_match: 0.5,
            title_relevance: 0.0,
        };
        // 0.15 + 0.35 + 0.20 + 0.05 + 0.0 = 0.75
        let score = MatchWeights::default().combine(&scores);
        assert!((score - 0.75).abs() < 1e-9, "score was {score}");
    }

    #[test]
    fn test_rank_scenario_python_sql_profile() {
        let profile = profile(&["python", "sql"], 3.0);
        let postings = vec![
            posting(
                "a",
                "Data Engineer",
                &["python", "sql", "amazon web services"],
                "Build Python and SQL data pipelines on AWS. 3+ years of experience.",
            ),
            posting(
                "b",
                "Java Developer",
                &["java"],
                "Java Spring microservices for payment processing.",
            ),
        ];

        let ranking = MatchingEngine::default().rank(&profile, &postings);
        assert_eq!(ranking.results[0].job_id, "a");
        assert_eq!(ranking.results[1].job_id, "b");
        assert!(ranking.results[0].final_score >= 0.5);
        assert!(ranking.results[1].final_score < 0.5);
        assert_eq!(ranking.results[0].missing_skills, vec!["amazon web services"]);
    }

    #[test]
    fn test_rank_is_deterministic() {
        let profile = profile(&["python"], 2.0);
        let postings = vec![
            posting("z", "Engineer", &["python"], "python"),
            posting("m", "Engineer", &["python"], "python"),
            posting("c", "Analyst", &["excel"], "spreadsheets"),
        ];
        let engine = MatchingEngine::default();
        let first = engine.rank(&profile, &postings);
        let second = engine.rank(&profile, &postings);
        assert_eq!(first, second);
    }

    #[test]
    fn test_ties_broken_by_ascending_job_id() {
        let profile = profile(&["python"], 2.0);
        let postings = vec![
            posting("z", "Engineer", &["python"], "python"),
            posting("m", "Engineer", &["python"], "python"),
        ];
        let ranking = MatchingEngine::default().rank(&profile, &postings);
        assert_eq!(ranking.results[0].final_score, ranking.results[1].final_score);
        assert_eq!(ranking.results[0].job_id, "m");
        assert_eq!(ranking.results[1].job_id, "z");
    }

    #[test]
    fn test_missing_fields_degrade_without_failing() {
        let mut profile = profile(&["python"], 0.0);
        profile.raw_text.clear();
        profile.location.clear();
        let postings = vec![posting("x", "", &[], "")];

        let ranking = MatchingEngine::default().rank(&profile, &postings);
        let result = &ranking.results[0];
        assert_eq!(ranking.degraded, 1);
        assert_eq!(result.components.text_similarity, 0.0);
        assert_eq!(result.components.skill_match, 0.0);
        assert_eq!(result.components.experience_match, 1.0);
        assert_eq!(result.components.location_match, 0.5);
        assert!(result.fallbacks.contains(&ScoreComponent::SkillMatch));
        assert!(result.fallbacks.contains(&ScoreComponent::TextSimilarity));
    }

    #[test]
    fn test_required_skills_extracted_from_description_when_absent() {
        let profile = profile(&["python", "docker"], 4.0);
        let postings = vec![posting("x", "Engineer", &[], "Python and Docker on Kubernetes")];
        let result = &MatchingEngine::default().rank(&profile, &postings).results[0];
        assert!((result.components.skill_match - 2.0 / 3.0).abs() < 1e-9);
        assert!(!result.fallbacks.contains(&ScoreComponent::SkillMatch));
    }

    #[test]
    fn test_duplicate_ids_collapse_last_wins() {
        let profile = profile(&["python"], 2.0);
        let postings = vec![
            posting("dup", "Old Title", &["java"], "java"),
            posting("dup", "Data Engineer", &["python"], "python"),
        ];
        let ranking = MatchingEngine::default().rank(&profile, &postings);
        assert_eq!(ranking.results.len(), 1);
        assert_eq!(ranking.results[0].components.skill_match, 1.0);
    }

    #[test]
    fn test_top_filters_and_truncates() {
        let profile = profile(&["python"], 2.0);
        let postings = vec![
            posting("a", "Data Engineer", &["python"], "python pipelines"),
            posting("b", "Data Engineer", &["python"], "python pipelines"),
            posting("c", "Barista", &["latte art"], "coffee"),
        ];
        let ranking = MatchingEngine::default().rank(&profile, &postings);
        assert_eq!(ranking.top(Some(1), 0.0).len(), 1);
        let strong = ranking.top(None, 0.5);
        assert!(strong.iter().all(|r| r.job_id != "c"));
    }
}
