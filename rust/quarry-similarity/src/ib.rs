//! Information-based models: the score is the information content of the normalized
//! term frequency under a heavy-tailed distribution parameterized by `lambda`.

use std::fmt;

use crate::{
    base::{ModelScore, explain_boost},
    explanation::Explanation,
    normalization::Normalization,
    stats::BasicStats,
};

/// Probability distribution of the normalized term frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    /// Log-logistic.
    Ll,
    /// Smoothed power-law.
    Spl,
}

impl Distribution {
    pub fn score(&self, tfn: f32, lambda: f32) -> f32 {
        match self {
            Distribution::Ll => (-(lambda as f64 / (tfn + lambda) as f64).ln()) as f32,
            Distribution::Spl => {
                // The distribution is undefined at one.
                let lambda = (if lambda == 1.0 { 0.99f32 } else { lambda }) as f64;
                let t = tfn as f64;
                (-((lambda.powf(t / (t + 1.0)) - lambda) / (1.0 - lambda)).ln()) as f32
            }
        }
    }

    pub fn explain(&self, tfn: f32, lambda: f32) -> Explanation {
        let name = match self {
            Distribution::Ll => "DistributionLL",
            Distribution::Spl => "DistributionSPL",
        };
        Explanation::new(self.score(tfn, lambda), name)
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Distribution::Ll => "LL",
            Distribution::Spl => "SPL",
        })
    }
}

/// Estimate of the distribution parameter from collection statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lambda {
    /// `(docFreq + 1) / (numberOfDocuments + 1)`.
    DocumentFrequency,
    /// `(totalTermFreq + 1) / (numberOfDocuments + 1)`.
    TotalTermFrequency,
}

impl Lambda {
    pub fn lambda(&self, stats: &BasicStats) -> f32 {
        let numerator = match self {
            Lambda::DocumentFrequency => stats.doc_freq,
            Lambda::TotalTermFrequency => stats.total_term_freq,
        };
        (numerator as f32 + 1.0) / (stats.number_of_documents as f32 + 1.0)
    }

    pub fn explain(&self, stats: &BasicStats) -> Explanation {
        let value = self.lambda(stats);
        let documents = Explanation::new(stats.number_of_documents as f32, "numberOfDocuments");
        match self {
            Lambda::DocumentFrequency => {
                Explanation::new(value, "lambda, computed as (n + 1) / (N + 1) from:")
                    .with_detail(Explanation::new(stats.doc_freq as f32, "docFreq"))
                    .with_detail(documents)
            }
            Lambda::TotalTermFrequency => {
                Explanation::new(value, "lambda, computed as (F + 1) / (N + 1) from:")
                    .with_detail(Explanation::new(stats.total_term_freq as f32, "totalTermFreq"))
                    .with_detail(documents)
            }
        }
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lambda::DocumentFrequency => "D",
            Lambda::TotalTermFrequency => "L",
        })
    }
}

/// `score = boost * distribution(tfn, lambda)`.
#[derive(Debug, Clone, PartialEq)]
pub struct IbSimilarity {
    distribution: Distribution,
    lambda: Lambda,
    normalization: Normalization,
    discount_overlaps: bool,
}

impl IbSimilarity {
    pub fn new(distribution: Distribution, lambda: Lambda, normalization: Normalization) -> Self {
        IbSimilarity {
            distribution,
            lambda,
            normalization,
            discount_overlaps: true,
        }
    }

    pub fn with_discount_overlaps(mut self, discount_overlaps: bool) -> Self {
        self.discount_overlaps = discount_overlaps;
        self
    }

    pub fn distribution(&self) -> Distribution {
        self.distribution
    }

    pub fn lambda(&self) -> Lambda {
        self.lambda
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn discount_overlaps(&self) -> bool {
        self.discount_overlaps
    }

    pub fn score(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> f32 {
        stats.total_boost
            * self.distribution.score(
                self.normalization.tfn(stats, freq, doc_len),
                self.lambda.lambda(stats),
            )
    }
}

impl ModelScore for IbSimilarity {
    fn name(&self) -> &'static str {
        "IbSimilarity"
    }

    fn score(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> f32 {
        IbSimilarity::score(self, stats, freq, doc_len)
    }

    fn explain_details(&self, expl: &mut Explanation, stats: &BasicStats, freq: f32, doc_len: f32) {
        explain_boost(expl, stats);
        let norm = self.normalization.explain(stats, freq, doc_len);
        let lambda = self.lambda.explain(stats);
        let distribution = self.distribution.explain(norm.value(), lambda.value());
        expl.add_detail(norm);
        expl.add_detail(lambda);
        expl.add_detail(distribution);
    }
}

impl fmt::Display for IbSimilarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IB {}-{}{}",
            self.distribution, self.lambda, self.normalization
        )
    }
}
