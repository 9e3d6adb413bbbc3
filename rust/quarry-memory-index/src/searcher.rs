//! Query evaluation against the single document of a [`MemoryIndexReader`].

use std::sync::Arc;

use quarry_common::Result;
use quarry_similarity::{CollectionStatistics, Explanation, Similarity, TermStatistics};

use crate::{
    query::Query,
    reader::MemoryIndexReader,
    weight::{Weight, WeightBuilder},
};

pub struct IndexSearcher<'a> {
    reader: MemoryIndexReader<'a>,
    similarity: Arc<Similarity>,
}

impl<'a> IndexSearcher<'a> {
    /// A searcher scoring with the default similarity.
    pub fn new(reader: MemoryIndexReader<'a>) -> IndexSearcher<'a> {
        IndexSearcher {
            reader,
            similarity: Arc::new(Similarity::default()),
        }
    }

    pub fn with_similarity(mut self, similarity: impl Into<Arc<Similarity>>) -> Self {
        self.set_similarity(similarity);
        self
    }

    /// Replaces the similarity. Weights created before the change can no longer score
    /// through this searcher.
    pub fn set_similarity(&mut self, similarity: impl Into<Arc<Similarity>>) {
        self.similarity = similarity.into();
    }

    pub fn similarity(&self) -> &Arc<Similarity> {
        &self.similarity
    }

    pub fn reader(&self) -> &MemoryIndexReader<'a> {
        &self.reader
    }

    /// Statistics of `field` over the one-document collection.
    pub fn collection_statistics(&self, field: &str) -> Result<CollectionStatistics> {
        let max_doc = self.reader.max_doc() as i64;
        match self.reader.terms(field) {
            Some(terms) => CollectionStatistics::new(
                field,
                max_doc,
                terms.doc_count(),
                terms.sum_total_term_freq(),
                terms.sum_doc_freq(),
            ),
            None => Ok(CollectionStatistics::empty(field, max_doc)),
        }
    }

    pub fn term_statistics(&self, field: &str, term: &[u8]) -> Result<TermStatistics> {
        match self.reader.terms(field) {
            Some(terms) => {
                let mut iter = terms.iter();
                if iter.seek_exact(term) {
                    let total_term_freq = iter.total_term_freq().unwrap_or(-1);
                    TermStatistics::new(term, iter.doc_freq() as i64, total_term_freq)
                } else {
                    TermStatistics::new(term, 0, 0)
                }
            }
            None => TermStatistics::new(term, 0, 0),
        }
    }

    /// Frequency of `term` in `doc`, or `None` if the document does not contain it.
    pub(crate) fn term_freq(&self, field: &str, term: &[u8], doc: u32) -> Option<u32> {
        let mut iter = self.reader.terms(field)?.iter();
        if !iter.seek_exact(term) {
            return None;
        }
        let mut docs = iter.docs()?;
        (docs.advance(doc) == doc).then(|| docs.freq())
    }

    /// Builds the weight of `query` and normalizes it with the similarity's query norm.
    pub fn create_normalized_weight<'q>(&self, query: &'q Query) -> Result<Weight<'q>> {
        let builder = WeightBuilder::new(self, query)?;
        let sum = builder.value_for_normalization();
        let mut norm = self.similarity.query_norm(sum);
        if !norm.is_finite() {
            norm = 1.0;
        }
        log::trace!("normalizing weight of {query}: sum={sum}, norm={norm}");
        Ok(builder.normalize(norm, 1.0))
    }

    /// Score of the document, or `0.0` when it does not match.
    pub fn score(&self, query: &Query) -> Result<f32> {
        let weight = self.create_normalized_weight(query)?;
        Ok(weight.score(self, 0)?.unwrap_or(0.0))
    }

    pub fn explain(&self, query: &Query, doc: u32) -> Result<Explanation> {
        self.reader.check_doc(doc)?;
        self.create_normalized_weight(query)?.explain(self, doc)
    }
}
