//! Divergence from randomness.
//!
//! A DFR model multiplies three independent components: a basic model of how likely
//! the observed term frequency is under a random distribution, an after-effect that
//! accounts for the risk of accepting the term as a good descriptor, and a
//! normalization of the term frequency by document length.

use std::f64::consts::{E, LOG2_E, PI};
use std::fmt;

use crate::{
    base::{ModelScore, explain_boost},
    explanation::Explanation,
    normalization::Normalization,
    stats::BasicStats,
};

#[inline]
fn log2(x: f64) -> f64 {
    x.log2()
}

/// Basic randomness models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicModel {
    /// Limiting form of the Bose-Einstein model.
    Be,
    /// Divergence approximation of the binomial model.
    D,
    /// Geometric approximation of the Bose-Einstein model.
    G,
    /// Inverse term frequency; approximates `Ine`.
    If,
    /// Inverse document frequency.
    In,
    /// Inverse expected document frequency.
    Ine,
    /// Poisson approximation of the binomial model.
    P,
}

impl BasicModel {
    pub fn score(&self, stats: &BasicStats, tfn: f32) -> f32 {
        let n_docs = stats.number_of_documents as f64;
        let ttf = stats.total_term_freq as f64;
        let t = tfn as f64;
        match self {
            BasicModel::Be => {
                let f = |n: f64, m: f64| (m + 0.5) * log2(n / m) + (n - m) * log2(n);
                let big_f = ttf + 1.0 + t;
                let big_n = big_f + n_docs;
                (-log2((big_n - 1.0) * E) + f(big_n + big_f - 1.0, big_n + big_f - t - 2.0)
                    - f(big_f, big_f - t)) as f32
            }
            BasicModel::D => {
                let big_f = ttf + 1.0 + t;
                let phi = t / big_f;
                let nphi = 1.0 - phi;
                let p = 1.0 / (n_docs + 1.0);
                let d = phi * log2(phi / p) + nphi * log2(nphi / (1.0 - p));
                (d * big_f + 0.5 * log2(1.0 + 2.0 * PI * t * nphi)) as f32
            }
            BasicModel::G => {
                let big_f = ttf + 1.0;
                let lambda = big_f / (n_docs + big_f);
                (log2(lambda + 1.0) + t * log2((1.0 + lambda) / lambda)) as f32
            }
            BasicModel::If => tfn * log2(1.0 + (n_docs + 1.0) / (ttf + 0.5)) as f32,
            BasicModel::In => {
                let n = stats.doc_freq as f64;
                tfn * log2((n_docs + 1.0) / (n + 0.5)) as f32
            }
            BasicModel::Ine => {
                let ne = n_docs * (1.0 - ((n_docs - 1.0) / n_docs).powf(ttf));
                tfn * log2((n_docs + 1.0) / (ne + 0.5)) as f32
            }
            BasicModel::P => {
                let lambda = ((ttf + 1.0) as f32 / (n_docs + 1.0) as f32) as f64;
                (t * log2(t / lambda)
                    + (lambda + 1.0 / (12.0 * t) - t) * LOG2_E
                    + 0.5 * log2(2.0 * PI * t)) as f32
            }
        }
    }

    fn class_name(&self) -> &'static str {
        match self {
            BasicModel::Be => "BasicModelBE",
            BasicModel::D => "BasicModelD",
            BasicModel::G => "BasicModelG",
            BasicModel::If => "BasicModelIF",
            BasicModel::In => "BasicModelIn",
            BasicModel::Ine => "BasicModelIne",
            BasicModel::P => "BasicModelP",
        }
    }

    pub fn explain(&self, stats: &BasicStats, tfn: f32) -> Explanation {
        let mut result = Explanation::new(
            self.score(stats, tfn),
            format!("{}, computed from: ", self.class_name()),
        );
        result.add_detail(Explanation::new(tfn, "tfn"));
        result.add_detail(Explanation::new(
            stats.number_of_documents as f32,
            "numberOfDocuments",
        ));
        if *self == BasicModel::In {
            result.add_detail(Explanation::new(stats.doc_freq as f32, "docFreq"));
        } else {
            result.add_detail(Explanation::new(stats.total_term_freq as f32, "totalTermFreq"));
        }
        result
    }
}

impl fmt::Display for BasicModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BasicModel::Be => "Be",
            BasicModel::D => "D",
            BasicModel::G => "G",
            BasicModel::If => "I(F)",
            BasicModel::In => "I(n)",
            BasicModel::Ine => "I(ne)",
            BasicModel::P => "P",
        })
    }
}

/// First normalization of the information gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterEffect {
    /// Constant `1`.
    None,
    /// Ratio of two Bernoulli processes.
    B,
    /// Laplace's law of succession.
    L,
}

impl AfterEffect {
    pub fn score(&self, stats: &BasicStats, tfn: f32) -> f32 {
        match self {
            AfterEffect::None => 1.0,
            AfterEffect::B => {
                let big_f = stats.total_term_freq + 1;
                let n = stats.doc_freq + 1;
                (big_f + 1) as f32 / (n as f32 * (tfn + 1.0))
            }
            AfterEffect::L => 1.0 / (tfn + 1.0),
        }
    }

    pub fn explain(&self, stats: &BasicStats, tfn: f32) -> Explanation {
        let value = self.score(stats, tfn);
        match self {
            AfterEffect::None => Explanation::new(value, "no aftereffect"),
            AfterEffect::B => Explanation::new(value, "AfterEffectB, computed from: ")
                .with_detail(Explanation::new(tfn, "tfn"))
                .with_detail(Explanation::new(stats.total_term_freq as f32, "totalTermFreq"))
                .with_detail(Explanation::new(stats.doc_freq as f32, "docFreq")),
            AfterEffect::L => Explanation::new(value, "AfterEffectL, computed from: ")
                .with_detail(Explanation::new(tfn, "tfn")),
        }
    }
}

impl fmt::Display for AfterEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AfterEffect::None => "",
            AfterEffect::B => "B",
            AfterEffect::L => "L",
        })
    }
}

/// `score = boost * basicModel(tfn) * afterEffect(tfn)` with `tfn` from the normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct DfrSimilarity {
    basic_model: BasicModel,
    after_effect: AfterEffect,
    normalization: Normalization,
    discount_overlaps: bool,
}

impl DfrSimilarity {
    pub fn new(
        basic_model: BasicModel,
        after_effect: AfterEffect,
        normalization: Normalization,
    ) -> DfrSimilarity {
        DfrSimilarity {
            basic_model,
            after_effect,
            normalization,
            discount_overlaps: true,
        }
    }

    pub fn with_discount_overlaps(mut self, discount_overlaps: bool) -> Self {
        self.discount_overlaps = discount_overlaps;
        self
    }

    pub fn basic_model(&self) -> BasicModel {
        self.basic_model
    }

    pub fn after_effect(&self) -> AfterEffect {
        self.after_effect
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn discount_overlaps(&self) -> bool {
        self.discount_overlaps
    }

    /// Scores one term occurrence count against a document of length `doc_len`.
    pub fn score(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> f32 {
        let tfn = self.normalization.tfn(stats, freq, doc_len);
        stats.total_boost
            * self.basic_model.score(stats, tfn)
            * self.after_effect.score(stats, tfn)
    }
}

impl ModelScore for DfrSimilarity {
    fn name(&self) -> &'static str {
        "DfrSimilarity"
    }

    fn score(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> f32 {
        DfrSimilarity::score(self, stats, freq, doc_len)
    }

    fn explain_details(&self, expl: &mut Explanation, stats: &BasicStats, freq: f32, doc_len: f32) {
        explain_boost(expl, stats);
        let norm = self.normalization.explain(stats, freq, doc_len);
        let tfn = norm.value();
        expl.add_detail(norm);
        expl.add_detail(self.basic_model.explain(stats, tfn));
        expl.add_detail(self.after_effect.explain(stats, tfn));
    }
}

impl fmt::Display for DfrSimilarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DFR {}{}{}",
            self.basic_model, self.after_effect, self.normalization
        )
    }
}
