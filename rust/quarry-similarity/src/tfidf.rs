//! Classic vector-space TF-IDF ranking.

use std::sync::{Arc, LazyLock};

use crate::{
    bm25::idf_explain,
    explanation::Explanation,
    norms::{NormValues, norm_byte},
    small_float::{byte315_to_float, float_to_byte315},
    stats::{CollectionStatistics, FieldInvertState, TermStatistics},
};

static NORM_TABLE: LazyLock<[f32; 256]> = LazyLock::new(|| {
    let mut table = [0f32; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = byte315_to_float(i as u8);
    }
    table
});

/// `sqrt(freq) * idf^2 * boost * queryNorm * lengthNorm`, with coordination
/// matching across the clauses of a boolean query.
#[derive(Debug, Clone, PartialEq)]
pub struct TfIdfSimilarity {
    discount_overlaps: bool,
}

impl Default for TfIdfSimilarity {
    fn default() -> Self {
        TfIdfSimilarity {
            discount_overlaps: true,
        }
    }
}

impl TfIdfSimilarity {
    pub fn new() -> TfIdfSimilarity {
        Self::default()
    }

    pub fn with_discount_overlaps(mut self, discount_overlaps: bool) -> Self {
        self.discount_overlaps = discount_overlaps;
        self
    }

    pub fn discount_overlaps(&self) -> bool {
        self.discount_overlaps
    }

    pub fn tf(freq: f32) -> f32 {
        freq.sqrt()
    }

    pub fn idf(doc_freq: i64, num_docs: i64) -> f32 {
        ((num_docs as f64 / (doc_freq + 1) as f64).ln() + 1.0) as f32
    }

    pub fn coord(overlap: u32, max_overlap: u32) -> f32 {
        overlap as f32 / max_overlap as f32
    }

    pub fn query_norm(sum_of_squared_weights: f32) -> f32 {
        (1.0 / (sum_of_squared_weights as f64).sqrt()) as f32
    }

    pub fn sloppy_freq(distance: u32) -> f32 {
        1.0 / (distance as f32 + 1.0)
    }

    pub fn length_norm(&self, state: &FieldInvertState) -> f32 {
        let num_terms = state.effective_length(self.discount_overlaps);
        state.boost * (1.0 / (num_terms as f64).sqrt()) as f32
    }

    pub fn encode_norm_value(f: f32) -> u8 {
        float_to_byte315(f)
    }

    pub fn decode_norm_value(b: u8) -> f32 {
        NORM_TABLE[b as usize]
    }

    pub fn compute_norm(&self, state: &FieldInvertState) -> i64 {
        Self::encode_norm_value(self.length_norm(state)) as i64
    }

    pub(crate) fn compute_weight(
        &self,
        query_boost: f32,
        collection: &CollectionStatistics,
        terms: &[TermStatistics],
    ) -> IdfStats {
        let idf = idf_explain(collection, terms, Self::idf);
        let query_weight = idf.value() * query_boost;
        IdfStats {
            idf,
            query_boost,
            query_norm: 1.0,
            query_weight,
            value: 0.0,
        }
    }
}

/// Per-query state of a TF-IDF leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct IdfStats {
    pub(crate) idf: Explanation,
    pub(crate) query_boost: f32,
    pub(crate) query_norm: f32,
    /// `idf * boost * queryNorm` once normalized.
    pub(crate) query_weight: f32,
    /// `query_weight * idf`, the per-document multiplier.
    pub(crate) value: f32,
}

impl IdfStats {
    pub fn idf(&self) -> f32 {
        self.idf.value()
    }

    pub fn query_norm(&self) -> f32 {
        self.query_norm
    }

    pub(crate) fn value_for_normalization(&self) -> f32 {
        self.query_weight * self.query_weight
    }

    pub(crate) fn normalize(&mut self, query_norm: f32, top_level_boost: f32) {
        self.query_norm = query_norm * top_level_boost;
        self.query_weight *= self.query_norm;
        self.value = self.query_weight * self.idf.value();
    }
}

pub struct TfIdfScorer<'a> {
    stats: &'a IdfStats,
    norms: Option<Arc<dyn NormValues>>,
}

impl<'a> TfIdfScorer<'a> {
    pub(crate) fn new(stats: &'a IdfStats, norms: Option<Arc<dyn NormValues>>) -> Self {
        TfIdfScorer { stats, norms }
    }

    fn field_norm(&self, doc: u32) -> Option<f32> {
        self.norms
            .as_ref()
            .map(|norms| TfIdfSimilarity::decode_norm_value(norm_byte(norms.get(doc))))
    }

    #[inline]
    pub fn score(&self, doc: u32, freq: f32) -> f32 {
        let raw = TfIdfSimilarity::tf(freq) * self.stats.value;
        match self.field_norm(doc) {
            Some(norm) => raw * norm,
            None => raw,
        }
    }

    pub fn explain(&self, doc: u32, freq: Explanation) -> Explanation {
        let stats = self.stats;
        let f = freq.value();
        let mut result = Explanation::new(0.0, format!("score(doc={doc},freq={f}), product of:"));

        let mut query = Explanation::new(0.0, "queryWeight, product of:");
        if stats.query_boost != 1.0 {
            query.add_detail(Explanation::new(stats.query_boost, "boost"));
        }
        query.add_detail(stats.idf.clone());
        query.add_detail(Explanation::new(stats.query_norm, "queryNorm"));
        query.set_value(stats.query_boost * stats.idf.value() * stats.query_norm);

        let mut field = Explanation::new(0.0, format!("fieldWeight in {doc}, product of:"));
        let tf = Explanation::new(
            TfIdfSimilarity::tf(f),
            format!("tf(freq={f}), with freq of:"),
        )
        .with_detail(freq);
        let tf_value = tf.value();
        field.add_detail(tf);
        field.add_detail(stats.idf.clone());
        let norm = self.field_norm(doc).unwrap_or(1.0);
        field.add_detail(Explanation::new(norm, format!("fieldNorm(doc={doc})")));
        field.set_value(tf_value * stats.idf.value() * norm);

        if query.value() == 1.0 {
            return field;
        }
        result.set_value(query.value() * field.value());
        result.add_detail(query);
        result.add_detail(field);
        result
    }
}
