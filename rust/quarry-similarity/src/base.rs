//! Machinery shared by the probabilistic models (DFR, IB and the language models):
//! statistics gathering, the length norm table, scorers and explanations.

use std::sync::{Arc, LazyLock};

use crate::{
    explanation::Explanation,
    norms::{NormValues, norm_byte},
    small_float::{byte315_to_float, float_to_byte315},
    stats::{BasicStats, CollectionStatistics, FieldInvertState, TermStatistics},
};

/// Decoded document length for every norm byte. Byte 0 maps to the inverse of the
/// largest length so that no entry is infinite.
static NORM_TABLE: LazyLock<[f32; 256]> = LazyLock::new(|| {
    let mut table = [0f32; 256];
    for (i, entry) in table.iter_mut().enumerate().skip(1) {
        let f = byte315_to_float(i as u8);
        *entry = 1.0 / (f * f);
    }
    table[0] = 1.0 / table[255];
    table
});

pub fn encode_norm_value(boost: f32, length: i32) -> u8 {
    float_to_byte315(boost / (length as f32).sqrt())
}

pub fn decode_norm_value(b: u8) -> f32 {
    NORM_TABLE[b as usize]
}

pub(crate) fn compute_norm(state: &FieldInvertState, discount_overlaps: bool) -> i64 {
    encode_norm_value(state.boost, state.effective_length(discount_overlaps)) as i64
}

/// One [`BasicStats`] per term of the leaf.
pub(crate) fn compute_weight(
    query_boost: f32,
    collection: &CollectionStatistics,
    terms: &[TermStatistics],
) -> Vec<BasicStats> {
    terms
        .iter()
        .map(|term| BasicStats::new(collection, term, query_boost))
        .collect()
}

/// A model expressed as a function of [`BasicStats`], frequency and document length.
pub(crate) trait ModelScore {
    /// Type name shown in explanations.
    fn name(&self) -> &'static str;

    fn score(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> f32;

    /// Adds the model specific factors to `expl`, whose value is already set.
    fn explain_details(&self, expl: &mut Explanation, stats: &BasicStats, freq: f32, doc_len: f32);
}

pub struct BaseScorer<'a> {
    model: &'a dyn ModelScore,
    stats: &'a [BasicStats],
    norms: Option<Arc<dyn NormValues>>,
}

impl<'a> BaseScorer<'a> {
    pub(crate) fn new(
        model: &'a dyn ModelScore,
        stats: &'a [BasicStats],
        norms: Option<Arc<dyn NormValues>>,
    ) -> Self {
        BaseScorer {
            model,
            stats,
            norms,
        }
    }

    #[inline]
    fn doc_len(&self, doc: u32) -> f32 {
        match &self.norms {
            Some(norms) => decode_norm_value(norm_byte(norms.get(doc))),
            None => 1.0,
        }
    }

    pub fn score(&self, doc: u32, freq: f32) -> f32 {
        let doc_len = self.doc_len(doc);
        self.stats
            .iter()
            .map(|stats| self.model.score(stats, freq, doc_len))
            .sum()
    }

    pub fn explain(&self, doc: u32, freq: Explanation) -> Explanation {
        let doc_len = self.doc_len(doc);
        if let [stats] = self.stats {
            return self.explain_one(stats, doc, freq, doc_len);
        }
        let mut sum = Explanation::new(0.0, "sum of:");
        let mut total = 0.0;
        for stats in self.stats {
            let detail = self.explain_one(stats, doc, freq.clone(), doc_len);
            total += detail.value();
            sum.add_detail(detail);
        }
        sum.set_value(total);
        sum
    }

    fn explain_one(
        &self,
        stats: &BasicStats,
        doc: u32,
        freq: Explanation,
        doc_len: f32,
    ) -> Explanation {
        let f = freq.value();
        let mut result = Explanation::new(
            self.model.score(stats, f, doc_len),
            format!(
                "score({}, doc={doc}, freq={f}), computed from:",
                self.model.name()
            ),
        );
        result.add_detail(freq);
        self.model.explain_details(&mut result, stats, f, doc_len);
        result
    }
}

/// Adds the boost detail when it differs from one.
pub(crate) fn explain_boost(expl: &mut Explanation, stats: &BasicStats) {
    if stats.total_boost != 1.0 {
        expl.add_detail(Explanation::new(stats.total_boost, "boost"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_table_is_finite() {
        assert!((0..=255u8).all(|b| decode_norm_value(b).is_finite()));
        assert_eq!(decode_norm_value(0), 1.0 / decode_norm_value(255));
        // 1 / sqrt(4) = 0.5 is exactly representable.
        assert_eq!(decode_norm_value(encode_norm_value(1.0, 4)), 4.0);
    }

    #[test]
    fn test_lengths_decode_close_to_original() {
        for length in [1, 2, 3, 10, 40, 100, 1000] {
            let decoded = decode_norm_value(encode_norm_value(1.0, length));
            let ratio = decoded / length as f32;
            assert!((1.0..1.6).contains(&ratio), "length={length} decoded={decoded}");
        }
    }
}
