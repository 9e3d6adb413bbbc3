//! Okapi BM25 ranking.

use std::sync::{Arc, LazyLock};

use quarry_common::{Result, verify_arg};

use crate::{
    explanation::Explanation,
    norms::{NormValues, norm_byte},
    small_float::{byte315_to_float, float_to_byte315},
    stats::{CollectionStatistics, FieldInvertState, TermStatistics},
};

/// Decoded field length for every norm byte: `1 / f^2` of the 315 float.
static NORM_TABLE: LazyLock<[f32; 256]> = LazyLock::new(|| {
    let mut table = [0f32; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let f = byte315_to_float(i as u8);
        *entry = 1.0 / (f * f);
    }
    table
});

/// BM25 with the classic `k1` term-frequency saturation and `b` length normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Bm25Similarity {
    k1: f32,
    b: f32,
    discount_overlaps: bool,
}

impl Default for Bm25Similarity {
    fn default() -> Self {
        Bm25Similarity {
            k1: 1.2,
            b: 0.75,
            discount_overlaps: true,
        }
    }
}

impl Bm25Similarity {
    pub fn new(k1: f32, b: f32) -> Result<Bm25Similarity> {
        verify_arg!(k1, k1.is_finite() && k1 >= 0.0);
        verify_arg!(b, (0.0..=1.0).contains(&b));
        Ok(Bm25Similarity {
            k1,
            b,
            discount_overlaps: true,
        })
    }

    pub fn with_discount_overlaps(mut self, discount_overlaps: bool) -> Self {
        self.discount_overlaps = discount_overlaps;
        self
    }

    pub fn k1(&self) -> f32 {
        self.k1
    }

    pub fn b(&self) -> f32 {
        self.b
    }

    pub fn discount_overlaps(&self) -> bool {
        self.discount_overlaps
    }

    pub fn idf(doc_freq: i64, num_docs: i64) -> f32 {
        (1.0 + (num_docs as f64 - doc_freq as f64 + 0.5) / (doc_freq as f64 + 0.5)).ln() as f32
    }

    pub fn avg_field_length(collection: &CollectionStatistics) -> f32 {
        if collection.sum_total_term_freq <= 0 {
            1.0
        } else {
            (collection.sum_total_term_freq as f64 / collection.max_doc as f64) as f32
        }
    }

    pub fn encode_norm_value(boost: f32, field_length: i32) -> u8 {
        float_to_byte315(boost / (field_length as f32).sqrt())
    }

    pub fn decode_norm_value(b: u8) -> f32 {
        NORM_TABLE[b as usize]
    }

    pub fn compute_norm(&self, state: &FieldInvertState) -> i64 {
        let length = state.effective_length(self.discount_overlaps);
        Self::encode_norm_value(state.boost, length) as i64
    }

    pub fn sloppy_freq(distance: u32) -> f32 {
        1.0 / (distance as f32 + 1.0)
    }

    pub(crate) fn compute_weight(
        &self,
        query_boost: f32,
        collection: &CollectionStatistics,
        terms: &[TermStatistics],
    ) -> Bm25Stats {
        let idf = idf_explain(collection, terms, Self::idf);
        let avgdl = Self::avg_field_length(collection);
        let mut cache = Box::new([0f32; 256]);
        for (i, entry) in cache.iter_mut().enumerate() {
            *entry =
                self.k1 * ((1.0 - self.b) + self.b * Self::decode_norm_value(i as u8) / avgdl);
        }
        Bm25Stats {
            idf,
            avgdl,
            query_boost,
            top_level_boost: 1.0,
            weight: 0.0,
            cache,
        }
    }
}

/// Explains the idf of one term, or the sum of idfs of a multi-term leaf.
pub(crate) fn idf_explain(
    collection: &CollectionStatistics,
    terms: &[TermStatistics],
    idf: impl Fn(i64, i64) -> f32,
) -> Explanation {
    let max = collection.max_doc;
    let single = |term: &TermStatistics| {
        let df = term.doc_freq;
        Explanation::new(idf(df, max), format!("idf(docFreq={df}, maxDocs={max})"))
    };
    if let [term] = terms {
        return single(term);
    }
    let mut sum = Explanation::new(0.0, "idf(), sum of:");
    let mut total = 0.0;
    for term in terms {
        let detail = single(term);
        total += detail.value();
        sum.add_detail(detail);
    }
    sum.set_value(total);
    sum
}

/// Per-query state of a BM25 leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Bm25Stats {
    pub(crate) idf: Explanation,
    pub(crate) avgdl: f32,
    pub(crate) query_boost: f32,
    pub(crate) top_level_boost: f32,
    /// `idf * query_boost * top_level_boost`, set by `normalize`.
    pub(crate) weight: f32,
    /// `k1 * ((1 - b) + b * length(norm) / avgdl)` for every norm byte.
    pub(crate) cache: Box<[f32; 256]>,
}

impl Bm25Stats {
    pub fn idf(&self) -> f32 {
        self.idf.value()
    }

    pub fn avgdl(&self) -> f32 {
        self.avgdl
    }

    pub(crate) fn value_for_normalization(&self) -> f32 {
        let query_weight = self.idf.value() * self.query_boost;
        query_weight * query_weight
    }

    /// The query norm plays no part in BM25; only the boosts do.
    pub(crate) fn normalize(&mut self, _query_norm: f32, top_level_boost: f32) {
        self.top_level_boost = top_level_boost;
        self.weight = self.idf.value() * self.query_boost * top_level_boost;
    }
}

pub struct Bm25Scorer<'a> {
    similarity: &'a Bm25Similarity,
    stats: &'a Bm25Stats,
    weight_value: f32,
    norms: Option<Arc<dyn NormValues>>,
}

impl<'a> Bm25Scorer<'a> {
    pub(crate) fn new(
        similarity: &'a Bm25Similarity,
        stats: &'a Bm25Stats,
        norms: Option<Arc<dyn NormValues>>,
    ) -> Self {
        Bm25Scorer {
            similarity,
            stats,
            weight_value: stats.weight * (similarity.k1 + 1.0),
            norms,
        }
    }

    #[inline]
    pub fn score(&self, doc: u32, freq: f32) -> f32 {
        let norm = match &self.norms {
            Some(norms) => self.stats.cache[norm_byte(norms.get(doc)) as usize],
            None => self.similarity.k1,
        };
        self.weight_value * freq / (freq + norm)
    }

    pub fn explain(&self, doc: u32, freq: Explanation) -> Explanation {
        let k1 = self.similarity.k1;
        let b = self.similarity.b;
        let stats = self.stats;
        let f = freq.value();

        let mut result = Explanation::new(0.0, format!("score(doc={doc},freq={f}), product of:"));
        let boost = Explanation::new(stats.query_boost * stats.top_level_boost, "boost");
        let boost_value = boost.value();
        if boost_value != 1.0 {
            result.add_detail(boost);
        }
        result.add_detail(stats.idf.clone());

        let mut tf_norm = Explanation::new(0.0, "tfNorm, computed from:");
        tf_norm.add_detail(freq);
        tf_norm.add_detail(Explanation::new(k1, "parameter k1"));
        match &self.norms {
            None => {
                tf_norm.add_detail(Explanation::new(0.0, "parameter b (norms omitted for field)"));
                tf_norm.set_value(f * (k1 + 1.0) / (f + k1));
            }
            Some(norms) => {
                let doc_len = Bm25Similarity::decode_norm_value(norm_byte(norms.get(doc)));
                tf_norm.add_detail(Explanation::new(b, "parameter b"));
                tf_norm.add_detail(Explanation::new(stats.avgdl, "avgFieldLength"));
                tf_norm.add_detail(Explanation::new(doc_len, "fieldLength"));
                tf_norm.set_value(
                    f * (k1 + 1.0) / (f + k1 * ((1.0 - b) + b * doc_len / stats.avgdl)),
                );
            }
        }
        let tf_norm_value = tf_norm.value();
        result.add_detail(tf_norm);
        result.set_value(boost_value * stats.idf.value() * tf_norm_value);
        result
    }
}
