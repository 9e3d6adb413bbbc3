//! Statistics consumed by the similarity models.

use quarry_common::{Result, verify_arg};

/// Field-wide statistics of the collection being searched.
///
/// A value of `-1` in `doc_count`, `sum_total_term_freq` or `sum_doc_freq` means the
/// underlying index does not track that statistic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStatistics {
    pub field: String,
    pub max_doc: i64,
    pub doc_count: i64,
    pub sum_total_term_freq: i64,
    pub sum_doc_freq: i64,
}

impl CollectionStatistics {
    pub fn new(
        field: impl Into<String>,
        max_doc: i64,
        doc_count: i64,
        sum_total_term_freq: i64,
        sum_doc_freq: i64,
    ) -> Result<CollectionStatistics> {
        verify_arg!(max_doc, max_doc >= 0);
        verify_arg!(doc_count, doc_count >= -1 && doc_count <= max_doc);
        verify_arg!(sum_doc_freq, sum_doc_freq == -1 || sum_doc_freq >= doc_count);
        verify_arg!(
            sum_total_term_freq,
            sum_total_term_freq == -1 || sum_total_term_freq >= sum_doc_freq
        );
        Ok(CollectionStatistics {
            field: field.into(),
            max_doc,
            doc_count,
            sum_total_term_freq,
            sum_doc_freq,
        })
    }

    /// Statistics of a field that has no terms at all.
    pub fn empty(field: impl Into<String>, max_doc: i64) -> CollectionStatistics {
        CollectionStatistics {
            field: field.into(),
            max_doc,
            doc_count: 0,
            sum_total_term_freq: 0,
            sum_doc_freq: 0,
        }
    }
}

/// Statistics of a single term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermStatistics {
    pub term: Vec<u8>,
    pub doc_freq: i64,
    /// Total occurrences across all documents, or `-1` when not tracked.
    pub total_term_freq: i64,
}

impl TermStatistics {
    pub fn new(
        term: impl Into<Vec<u8>>,
        doc_freq: i64,
        total_term_freq: i64,
    ) -> Result<TermStatistics> {
        verify_arg!(doc_freq, doc_freq >= 0);
        verify_arg!(
            total_term_freq,
            total_term_freq == -1 || total_term_freq >= doc_freq
        );
        Ok(TermStatistics {
            term: term.into(),
            doc_freq,
            total_term_freq,
        })
    }
}

/// Per-field state collected while a document is inverted; the input to norm computation.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInvertState {
    pub name: String,
    /// Number of tokens, including overlapping ones.
    pub length: i32,
    /// Tokens with a position increment of zero.
    pub num_overlap: i32,
    pub boost: f32,
}

impl FieldInvertState {
    pub fn new(name: impl Into<String>, length: i32, num_overlap: i32, boost: f32) -> Self {
        FieldInvertState {
            name: name.into(),
            length,
            num_overlap,
            boost,
        }
    }

    /// Length used for the norm, honoring the overlap discount policy.
    pub fn effective_length(&self, discount_overlaps: bool) -> i32 {
        if discount_overlaps {
            self.length - self.num_overlap
        } else {
            self.length
        }
    }
}

/// Term and collection statistics flattened into the quantities the DFR, IB and
/// language models work with, plus the query boosts.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicStats {
    pub field: String,
    pub number_of_documents: i64,
    pub number_of_field_tokens: i64,
    pub avg_field_length: f32,
    pub doc_freq: i64,
    pub total_term_freq: i64,
    /// Probability of the term in the collection; only the language models read it.
    pub collection_probability: f32,
    pub query_boost: f32,
    pub top_level_boost: f32,
    pub total_boost: f32,
}

impl BasicStats {
    pub fn new(
        collection: &CollectionStatistics,
        term: &TermStatistics,
        query_boost: f32,
    ) -> BasicStats {
        let doc_freq = term.doc_freq;
        let total_term_freq = if term.total_term_freq == -1 {
            doc_freq
        } else {
            term.total_term_freq
        };
        let (number_of_field_tokens, avg_field_length) = if collection.sum_total_term_freq <= 0 {
            (doc_freq, 1.0)
        } else {
            (
                collection.sum_total_term_freq,
                collection.sum_total_term_freq as f32 / collection.max_doc as f32,
            )
        };
        let collection_probability =
            (total_term_freq as f32 + 1.0) / (number_of_field_tokens as f32 + 1.0);
        BasicStats {
            field: collection.field.clone(),
            number_of_documents: collection.max_doc,
            number_of_field_tokens,
            avg_field_length,
            doc_freq,
            total_term_freq,
            collection_probability,
            query_boost,
            top_level_boost: 1.0,
            total_boost: query_boost,
        }
    }

    pub fn value_for_normalization(&self) -> f32 {
        self.query_boost * self.query_boost
    }

    /// The query norm is ignored; only the boosts take part in scoring.
    pub fn normalize(&mut self, _query_norm: f32, top_level_boost: f32) {
        self.top_level_boost = top_level_boost;
        self.total_boost = self.query_boost * top_level_boost;
    }
}
