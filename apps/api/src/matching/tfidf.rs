//! TF-IDF vector space built per ranking call.
//!
//! The vocabulary is the union of terms (unigrams and bigrams) across the
//! documents handed to `fit`, so scores are only comparable within one call.

use std::collections::{BTreeMap, BTreeSet};

use crate::matching::text::content_tokens;

pub type TermVector = BTreeMap<String, f64>;

#[derive(Debug, Clone, Default)]
pub struct TfIdfSpace {
    idf: BTreeMap<String, f64>,
}

impl TfIdfSpace {
    /// Fits inverse document frequencies over `documents`.
    ///
    /// Terms present in fewer than `min_document_frequency` documents are
    /// excluded. IDF is smoothed: `ln((1 + n) / (1 + df)) + 1`.
    pub fn fit(documents: &[&str], min_document_frequency: usize) -> Self {
        let n = documents.len() as f64;
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();

        for document in documents {
            let unique: BTreeSet<String> = terms(document).into_iter().collect();
            for term in unique {
                *document_frequency.entry(term).or_default() += 1;
            }
        }

        let min_df = min_document_frequency.max(1);
        let idf = document_frequency
            .into_iter()
            .filter(|(_, df)| *df >= min_df)
            .map(|(term, df)| {
                let weight = ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0;
                (term, weight)
            })
            .collect();

        Self { idf }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    /// Raw term counts weighted by IDF; out-of-vocabulary terms are dropped.
    pub fn vectorize(&self, document: &str) -> TermVector {
        let mut vector = TermVector::new();
        for term in terms(document) {
            if let Some(idf) = self.idf.get(&term) {
                *vector.entry(term).or_insert(0.0) += idf;
            }
        }
        vector
    }
}

/// Cosine similarity in [0, 1]; zero when either vector is empty.
pub fn cosine_similarity(a: &TermVector, b: &TermVector) -> f64 {
    let norm_a = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b = b.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, weight)| large.get(term).map(|other| weight * other))
        .sum();

    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

fn terms(document: &str) -> Vec<String> {
    let tokens = content_tokens(document);
    let bigrams: Vec<String> = tokens
        .windows(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect();
    let mut all = tokens;
    all.extend(bigrams);
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_documents_score_one() {
        let docs = ["python sql pipelines", "python sql pipelines", "java spring"];
        let space = TfIdfSpace::fit(&docs, 1);
        let a = space.vectorize(docs[0]);
        let b = space.vectorize(docs[1]);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_documents_score_zero() {
        let docs = ["python sql pipelines", "java spring microservices"];
        let space = TfIdfSpace::fit(&docs, 1);
        let a = space.vectorize(docs[0]);
        let b = space.vectorize(docs[1]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_empty_document_scores_zero() {
        let docs = ["python developer", ""];
        let space = TfIdfSpace::fit(&docs, 1);
        let a = space.vectorize(docs[0]);
        let b = space.vectorize(docs[1]);
        assert!(b.is_empty());
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_min_document_frequency_excludes_rare_terms() {
        let docs = ["python kafka", "python spark", "python"];
        let space = TfIdfSpace::fit(&docs, 2);
        assert_eq!(space.vocabulary_size(), 1);
        assert!(space.vectorize("kafka spark").is_empty());
    }

    #[test]
    fn test_bigrams_are_part_of_the_vocabulary() {
        let docs = ["machine learning engineer"];
        let space = TfIdfSpace::fit(&docs, 1);
        let vector = space.vectorize(docs[0]);
        assert!(vector.contains_key("machine learning"));
        assert!(vector.contains_key("learning engineer"));
    }

    #[test]
    fn test_partial_overlap_is_strictly_between_bounds() {
        let docs = ["python sql airflow", "python java spring"];
        let space = TfIdfSpace::fit(&docs, 1);
        let score = cosine_similarity(&space.vectorize(docs[0]), &space.vectorize(docs[1]));
        assert!(score > 0.0 && score < 1.0, "score was {score}");
    }
}
