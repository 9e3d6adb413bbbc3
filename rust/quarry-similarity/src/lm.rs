//! Language models with smoothing against the collection model.
//!
//! The collection model is `P(t|C) = (totalTermFreq + 1) / (numberOfFieldTokens + 1)`,
//! precomputed in [`BasicStats::collection_probability`].

use std::fmt;

use quarry_common::{Result, verify_arg};

use crate::{
    base::{ModelScore, explain_boost},
    explanation::Explanation,
    stats::BasicStats,
};

fn explain_collection_probability(expl: &mut Explanation, stats: &BasicStats) {
    expl.add_detail(Explanation::new(
        stats.collection_probability,
        "collection probability",
    ));
}

/// Bayesian smoothing with Dirichlet priors. Scores below zero are clamped to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct LmDirichletSimilarity {
    mu: f32,
    discount_overlaps: bool,
}

impl Default for LmDirichletSimilarity {
    fn default() -> Self {
        LmDirichletSimilarity {
            mu: 2000.0,
            discount_overlaps: true,
        }
    }
}

impl LmDirichletSimilarity {
    pub fn new(mu: f32) -> Result<Self> {
        verify_arg!(mu, mu.is_finite() && mu > 0.0);
        Ok(LmDirichletSimilarity {
            mu,
            discount_overlaps: true,
        })
    }

    pub fn with_discount_overlaps(mut self, discount_overlaps: bool) -> Self {
        self.discount_overlaps = discount_overlaps;
        self
    }

    pub fn mu(&self) -> f32 {
        self.mu
    }

    pub fn discount_overlaps(&self) -> bool {
        self.discount_overlaps
    }

    pub fn score(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> f32 {
        let mu = self.mu as f64;
        let score = stats.total_boost
            * ((1.0 + freq as f64 / (mu * stats.collection_probability as f64)).ln()
                + (mu / (doc_len as f64 + mu)).ln()) as f32;
        score.max(0.0)
    }
}

impl ModelScore for LmDirichletSimilarity {
    fn name(&self) -> &'static str {
        "LmDirichletSimilarity"
    }

    fn score(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> f32 {
        LmDirichletSimilarity::score(self, stats, freq, doc_len)
    }

    fn explain_details(&self, expl: &mut Explanation, stats: &BasicStats, freq: f32, doc_len: f32) {
        let mu = self.mu as f64;
        explain_boost(expl, stats);
        expl.add_detail(Explanation::new(self.mu, "mu"));
        expl.add_detail(Explanation::new(
            (1.0 + freq as f64 / (mu * stats.collection_probability as f64)).ln() as f32,
            "term weight",
        ));
        expl.add_detail(Explanation::new(
            (mu / (doc_len as f64 + mu)).ln() as f32,
            "document norm",
        ));
        explain_collection_probability(expl, stats);
    }
}

impl fmt::Display for LmDirichletSimilarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LM Dirichlet({})", self.mu)
    }
}

/// Linear interpolation between the document and the collection model.
#[derive(Debug, Clone, PartialEq)]
pub struct LmJelinekMercerSimilarity {
    lambda: f32,
    discount_overlaps: bool,
}

impl LmJelinekMercerSimilarity {
    /// `lambda` weighs the collection model; around `0.1` suits short queries and
    /// around `0.7` long ones.
    pub fn new(lambda: f32) -> Result<Self> {
        verify_arg!(lambda, lambda > 0.0 && lambda <= 1.0);
        Ok(LmJelinekMercerSimilarity {
            lambda,
            discount_overlaps: true,
        })
    }

    pub fn with_discount_overlaps(mut self, discount_overlaps: bool) -> Self {
        self.discount_overlaps = discount_overlaps;
        self
    }

    pub fn lambda(&self) -> f32 {
        self.lambda
    }

    pub fn discount_overlaps(&self) -> bool {
        self.discount_overlaps
    }

    pub fn score(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> f32 {
        let lambda = self.lambda;
        stats.total_boost
            * (1.0
                + ((1.0 - lambda) * freq / doc_len) as f64
                    / (lambda * stats.collection_probability) as f64)
                .ln() as f32
    }
}

impl ModelScore for LmJelinekMercerSimilarity {
    fn name(&self) -> &'static str {
        "LmJelinekMercerSimilarity"
    }

    fn score(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> f32 {
        LmJelinekMercerSimilarity::score(self, stats, freq, doc_len)
    }

    fn explain_details(&self, expl: &mut Explanation, stats: &BasicStats, _freq: f32, _doc_len: f32) {
        explain_boost(expl, stats);
        expl.add_detail(Explanation::new(self.lambda, "lambda"));
        explain_collection_probability(expl, stats);
    }
}

impl fmt::Display for LmJelinekMercerSimilarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LM Jelinek-Mercer({})", self.lambda)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{CollectionStatistics, TermStatistics};

    fn stats() -> BasicStats {
        let collection = CollectionStatistics::new("body", 100, 100, 5000, 1000).unwrap();
        let term = TermStatistics::new(b"term".to_vec(), 10, 70).unwrap();
        BasicStats::new(&collection, &term, 1.0)
    }

    #[test]
    fn test_collection_probability() {
        assert!((stats().collection_probability - 71.0 / 5001.0).abs() < 1e-7);
    }

    #[test]
    fn test_dirichlet() {
        let sim = LmDirichletSimilarity::default();
        let score = sim.score(&stats(), 7.0, 40.0);
        assert!((score - 0.200_559_6).abs() < 1e-5, "{score}");
    }

    #[test]
    fn test_dirichlet_clamps_negative_scores() {
        let sim = LmDirichletSimilarity::default();
        // A rare occurrence in a very long document.
        assert_eq!(sim.score(&stats(), 1.0, 100_000.0), 0.0);
    }

    #[test]
    fn test_jelinek_mercer() {
        let sim = LmJelinekMercerSimilarity::new(0.1).unwrap();
        let score = sim.score(&stats(), 7.0, 40.0);
        assert!((score - 4.717_942).abs() < 1e-5, "{score}");
    }

    #[test]
    fn test_parameters_are_validated() {
        assert!(LmDirichletSimilarity::new(0.0).is_err());
        assert!(LmJelinekMercerSimilarity::new(0.0).is_err());
        assert!(LmJelinekMercerSimilarity::new(1.5).is_err());
        assert!(LmJelinekMercerSimilarity::new(1.0).is_ok());
    }
}
