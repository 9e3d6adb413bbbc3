//! Term frequency normalizations shared by the DFR and IB models.

use std::fmt;

use crate::{explanation::Explanation, stats::BasicStats};

/// Turns a raw term frequency into `tfn`, the frequency normalized by document length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// `tfn = tf`.
    None,
    /// Uniform distribution of term frequency: `tf * c * avgFieldLength / len`.
    H1 { c: f32 },
    /// Frequency density inversely related to length: `tf * log2(1 + c * avgFieldLength / len)`.
    H2 { c: f32 },
    /// Dirichlet priors: `(tf + mu * P(t)) / (len + mu) * mu`.
    H3 { mu: f32 },
    /// Pareto-Zipf: `tf * (avgFieldLength / len)^z`.
    Z { z: f32 },
}

impl Normalization {
    pub fn h1() -> Self {
        Normalization::H1 { c: 1.0 }
    }

    pub fn h2() -> Self {
        Normalization::H2 { c: 1.0 }
    }

    pub fn h3() -> Self {
        Normalization::H3 { mu: 800.0 }
    }

    pub fn z() -> Self {
        Normalization::Z { z: 0.30 }
    }

    pub fn tfn(&self, stats: &BasicStats, tf: f32, len: f32) -> f32 {
        match *self {
            Normalization::None => tf,
            Normalization::H1 { c } => tf * c * (stats.avg_field_length / len),
            Normalization::H2 { c } => {
                (tf as f64 * (1.0 + c as f64 * stats.avg_field_length as f64 / len as f64).log2())
                    as f32
            }
            Normalization::H3 { mu } => {
                (tf + mu
                    * ((stats.total_term_freq as f32 + 1.0)
                        / (stats.number_of_field_tokens as f32 + 1.0)))
                    / (len + mu)
                    * mu
            }
            Normalization::Z { z } => {
                (tf as f64 * (stats.avg_field_length as f64 / len as f64).powf(z as f64)) as f32
            }
        }
    }

    pub fn explain(&self, stats: &BasicStats, tf: f32, len: f32) -> Explanation {
        let value = self.tfn(stats, tf, len);
        let (name, parameter) = match *self {
            Normalization::None => return Explanation::new(value, "no normalization"),
            Normalization::H1 { c } => ("NormalizationH1", Explanation::new(c, "c")),
            Normalization::H2 { c } => ("NormalizationH2", Explanation::new(c, "c")),
            Normalization::H3 { mu } => ("NormalizationH3", Explanation::new(mu, "mu")),
            Normalization::Z { z } => ("NormalizationZ", Explanation::new(z, "z")),
        };
        Explanation::new(value, format!("{name}, computed from: "))
            .with_detail(Explanation::new(tf, "tf"))
            .with_detail(Explanation::new(stats.avg_field_length, "avgFieldLength"))
            .with_detail(Explanation::new(len, "len"))
            .with_detail(parameter)
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalization::None => Ok(()),
            Normalization::H1 { .. } => f.write_str("1"),
            Normalization::H2 { .. } => f.write_str("2"),
            Normalization::H3 { .. } => f.write_str("3"),
            Normalization::Z { z } => write!(f, "Z({z})"),
        }
    }
}
