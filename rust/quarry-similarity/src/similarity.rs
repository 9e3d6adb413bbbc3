//! The closed set of ranking models and the query-time weight/scorer protocol.
//!
//! Scoring a query leaf goes through three steps:
//!
//! 1. [`Similarity::compute_weight`] turns collection and term statistics into a
//!    [`SimWeightBuilder`]. No index access happens here; every statistic is an argument.
//! 2. The query tree collects [`SimWeightBuilder::value_for_normalization`] from all
//!    leaves, derives a query norm and calls [`SimWeightBuilder::normalize`], which
//!    yields the immutable [`SimWeight`].
//! 3. [`Similarity::sim_scorer`] binds the weight to the field's norms. The resulting
//!    [`SimScorer`] scores and explains documents.

use std::fmt;
use std::mem::Discriminant;

use quarry_common::{Result, error::Error, verify_arg};

use crate::{
    base::{self, BaseScorer},
    bm25::{Bm25Scorer, Bm25Similarity, Bm25Stats},
    dfr::{AfterEffect, BasicModel, DfrSimilarity},
    explanation::Explanation,
    ib::{Distribution, IbSimilarity, Lambda},
    lm::{LmDirichletSimilarity, LmJelinekMercerSimilarity},
    normalization::Normalization,
    norms::NormSource,
    stats::{BasicStats, CollectionStatistics, FieldInvertState, TermStatistics},
    tfidf::{IdfStats, TfIdfScorer, TfIdfSimilarity},
};

/// A ranking model.
///
/// Instances are immutable once built and can be shared across threads.
#[derive(Debug, Clone, PartialEq)]
pub enum Similarity {
    Bm25(Bm25Similarity),
    TfIdf(TfIdfSimilarity),
    Dfr(DfrSimilarity),
    Ib(IbSimilarity),
    LmDirichlet(LmDirichletSimilarity),
    LmJelinekMercer(LmJelinekMercerSimilarity),
}

impl Default for Similarity {
    fn default() -> Self {
        Similarity::TfIdf(TfIdfSimilarity::default())
    }
}

impl Similarity {
    /// Model type name, as shown in query explanations.
    pub fn name(&self) -> &'static str {
        match self {
            Similarity::Bm25(_) => "Bm25Similarity",
            Similarity::TfIdf(_) => "TfIdfSimilarity",
            Similarity::Dfr(_) => "DfrSimilarity",
            Similarity::Ib(_) => "IbSimilarity",
            Similarity::LmDirichlet(_) => "LmDirichletSimilarity",
            Similarity::LmJelinekMercer(_) => "LmJelinekMercerSimilarity",
        }
    }

    /// Whether tokens with a zero position increment are excluded from the length norm.
    pub fn discount_overlaps(&self) -> bool {
        match self {
            Similarity::Bm25(sim) => sim.discount_overlaps(),
            Similarity::TfIdf(sim) => sim.discount_overlaps(),
            Similarity::Dfr(sim) => sim.discount_overlaps(),
            Similarity::Ib(sim) => sim.discount_overlaps(),
            Similarity::LmDirichlet(sim) => sim.discount_overlaps(),
            Similarity::LmJelinekMercer(sim) => sim.discount_overlaps(),
        }
    }

    /// Encodes the length norm of a field at index time.
    pub fn compute_norm(&self, state: &FieldInvertState) -> i64 {
        match self {
            Similarity::Bm25(sim) => sim.compute_norm(state),
            Similarity::TfIdf(sim) => sim.compute_norm(state),
            _ => base::compute_norm(state, self.discount_overlaps()),
        }
    }

    /// Computes the collection-level part of a query leaf's score.
    ///
    /// `terms` holds one entry per term of the leaf (more than one for phrases).
    pub fn compute_weight(
        &self,
        query_boost: f32,
        collection: &CollectionStatistics,
        terms: &[TermStatistics],
    ) -> Result<SimWeightBuilder> {
        verify_arg!(terms, !terms.is_empty());
        let stats = match self {
            Similarity::Bm25(sim) => {
                WeightStats::Bm25(sim.compute_weight(query_boost, collection, terms))
            }
            Similarity::TfIdf(sim) => {
                WeightStats::TfIdf(sim.compute_weight(query_boost, collection, terms))
            }
            _ => WeightStats::Basic(base::compute_weight(query_boost, collection, terms)),
        };
        log::trace!(
            "computed {self} weight for field {} over {} terms",
            collection.field,
            terms.len()
        );
        Ok(SimWeightBuilder {
            weight: SimWeight {
                field: collection.field.clone(),
                model: std::mem::discriminant(self),
                stats,
            },
        })
    }

    /// Binds a normalized weight to the norms of its field.
    pub fn sim_scorer<'a>(
        &'a self,
        weight: &'a SimWeight,
        norms: &dyn NormSource,
    ) -> Result<SimScorer<'a>> {
        if weight.model != std::mem::discriminant(self) {
            return Err(Error::invalid_arg(
                "weight",
                format!("weight was computed by a different model than {self}"),
            ));
        }
        let norms = norms.norm_values(&weight.field)?;
        let scorer = match (self, &weight.stats) {
            (Similarity::Bm25(sim), WeightStats::Bm25(stats)) => {
                SimScorer::Bm25(Bm25Scorer::new(sim, stats, norms))
            }
            (Similarity::TfIdf(_), WeightStats::TfIdf(stats)) => {
                SimScorer::TfIdf(TfIdfScorer::new(stats, norms))
            }
            (Similarity::Dfr(sim), WeightStats::Basic(stats)) => {
                SimScorer::Base(BaseScorer::new(sim, stats, norms))
            }
            (Similarity::Ib(sim), WeightStats::Basic(stats)) => {
                SimScorer::Base(BaseScorer::new(sim, stats, norms))
            }
            (Similarity::LmDirichlet(sim), WeightStats::Basic(stats)) => {
                SimScorer::Base(BaseScorer::new(sim, stats, norms))
            }
            (Similarity::LmJelinekMercer(sim), WeightStats::Basic(stats)) => {
                SimScorer::Base(BaseScorer::new(sim, stats, norms))
            }
            _ => return Err(Error::invalid_operation("sim_scorer: mismatched weight")),
        };
        Ok(scorer)
    }

    /// Score factor for a document matching `overlap` of `max_overlap` query clauses.
    pub fn coord(&self, overlap: u32, max_overlap: u32) -> f32 {
        match self {
            Similarity::TfIdf(_) => TfIdfSimilarity::coord(overlap, max_overlap),
            _ => 1.0,
        }
    }

    /// Normalization factor derived from the sum of the leaves' squared weights.
    pub fn query_norm(&self, value_for_normalization: f32) -> f32 {
        match self {
            Similarity::TfIdf(_) => TfIdfSimilarity::query_norm(value_for_normalization),
            _ => 1.0,
        }
    }
}

impl fmt::Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Similarity::Bm25(sim) => write!(f, "BM25(k1={},b={})", sim.k1(), sim.b()),
            Similarity::TfIdf(_) => f.write_str("DefaultSimilarity"),
            Similarity::Dfr(sim) => fmt::Display::fmt(sim, f),
            Similarity::Ib(sim) => fmt::Display::fmt(sim, f),
            Similarity::LmDirichlet(sim) => fmt::Display::fmt(sim, f),
            Similarity::LmJelinekMercer(sim) => fmt::Display::fmt(sim, f),
        }
    }
}

impl From<Bm25Similarity> for Similarity {
    fn from(sim: Bm25Similarity) -> Self {
        Similarity::Bm25(sim)
    }
}

impl From<TfIdfSimilarity> for Similarity {
    fn from(sim: TfIdfSimilarity) -> Self {
        Similarity::TfIdf(sim)
    }
}

impl From<DfrSimilarity> for Similarity {
    fn from(sim: DfrSimilarity) -> Self {
        Similarity::Dfr(sim)
    }
}

impl From<IbSimilarity> for Similarity {
    fn from(sim: IbSimilarity) -> Self {
        Similarity::Ib(sim)
    }
}

impl From<LmDirichletSimilarity> for Similarity {
    fn from(sim: LmDirichletSimilarity) -> Self {
        Similarity::LmDirichlet(sim)
    }
}

impl From<LmJelinekMercerSimilarity> for Similarity {
    fn from(sim: LmJelinekMercerSimilarity) -> Self {
        Similarity::LmJelinekMercer(sim)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum WeightStats {
    Bm25(Bm25Stats),
    TfIdf(IdfStats),
    /// One entry per term; the scores of the terms are summed.
    Basic(Vec<BasicStats>),
}

/// A weight that has not been normalized yet.
#[derive(Debug, Clone, PartialEq)]
pub struct SimWeightBuilder {
    weight: SimWeight,
}

impl SimWeightBuilder {
    pub fn field(&self) -> &str {
        &self.weight.field
    }

    /// This leaf's contribution to the query's sum of squared weights.
    pub fn value_for_normalization(&self) -> f32 {
        match &self.weight.stats {
            WeightStats::Bm25(stats) => stats.value_for_normalization(),
            WeightStats::TfIdf(stats) => stats.value_for_normalization(),
            WeightStats::Basic(stats) => stats.iter().map(|s| s.value_for_normalization()).sum(),
        }
    }

    /// Applies the query norm and the boost inherited from enclosing queries.
    pub fn normalize(mut self, query_norm: f32, top_level_boost: f32) -> SimWeight {
        match &mut self.weight.stats {
            WeightStats::Bm25(stats) => stats.normalize(query_norm, top_level_boost),
            WeightStats::TfIdf(stats) => stats.normalize(query_norm, top_level_boost),
            WeightStats::Basic(stats) => stats
                .iter_mut()
                .for_each(|s| s.normalize(query_norm, top_level_boost)),
        }
        self.weight
    }
}

/// Immutable per-query, per-field scoring state.
#[derive(Debug, Clone, PartialEq)]
pub struct SimWeight {
    field: String,
    model: Discriminant<Similarity>,
    stats: WeightStats,
}

impl SimWeight {
    pub fn field(&self) -> &str {
        &self.field
    }
}

/// Scores documents of one field for one query leaf.
pub enum SimScorer<'a> {
    Bm25(Bm25Scorer<'a>),
    TfIdf(TfIdfScorer<'a>),
    Base(BaseScorer<'a>),
}

impl SimScorer<'_> {
    pub fn score(&self, doc: u32, freq: f32) -> f32 {
        match self {
            SimScorer::Bm25(scorer) => scorer.score(doc, freq),
            SimScorer::TfIdf(scorer) => scorer.score(doc, freq),
            SimScorer::Base(scorer) => scorer.score(doc, freq),
        }
    }

    /// Breaks the score down into its factors. The value equals [`score`](Self::score).
    pub fn explain(&self, doc: u32, freq: Explanation) -> Explanation {
        match self {
            SimScorer::Bm25(scorer) => scorer.explain(doc, freq),
            SimScorer::TfIdf(scorer) => scorer.explain(doc, freq),
            SimScorer::Base(scorer) => scorer.explain(doc, freq),
        }
    }

    /// Frequency contribution of a sloppy phrase match at edit `distance`.
    pub fn compute_slop_factor(&self, distance: u32) -> f32 {
        1.0 / (distance as f32 + 1.0)
    }
}

/// Named similarity presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityKind {
    Bm25,
    TfIdf,
    DfrIn2,
    DfrInL2,
    DfrPL2,
    DfrIneB2,
    IbLlDf,
    IbSplTtf,
    LmDirichlet,
    LmJelinekMercer,
}

impl TryFrom<&str> for SimilarityKind {
    type Error = Error;

    fn try_from(name: &str) -> Result<Self> {
        match name {
            "bm25" => Ok(SimilarityKind::Bm25),
            "tfidf" | "default" => Ok(SimilarityKind::TfIdf),
            "dfr-in2" => Ok(SimilarityKind::DfrIn2),
            "dfr-inl2" => Ok(SimilarityKind::DfrInL2),
            "dfr-pl2" => Ok(SimilarityKind::DfrPL2),
            "dfr-ineb2" => Ok(SimilarityKind::DfrIneB2),
            "ib-ll-df" => Ok(SimilarityKind::IbLlDf),
            "ib-spl-ttf" => Ok(SimilarityKind::IbSplTtf),
            "lm-dirichlet" => Ok(SimilarityKind::LmDirichlet),
            "lm-jelinek-mercer" => Ok(SimilarityKind::LmJelinekMercer),
            _ => Err(Error::invalid_arg(
                "name",
                format!("Unrecognized similarity: {name}"),
            )),
        }
    }
}

impl SimilarityKind {
    pub const fn name(&self) -> &'static str {
        match self {
            SimilarityKind::Bm25 => "bm25",
            SimilarityKind::TfIdf => "tfidf",
            SimilarityKind::DfrIn2 => "dfr-in2",
            SimilarityKind::DfrInL2 => "dfr-inl2",
            SimilarityKind::DfrPL2 => "dfr-pl2",
            SimilarityKind::DfrIneB2 => "dfr-ineb2",
            SimilarityKind::IbLlDf => "ib-ll-df",
            SimilarityKind::IbSplTtf => "ib-spl-ttf",
            SimilarityKind::LmDirichlet => "lm-dirichlet",
            SimilarityKind::LmJelinekMercer => "lm-jelinek-mercer",
        }
    }
}

/// Jelinek-Mercer smoothing used by the `"lm-jelinek-mercer"` preset.
pub const DEFAULT_JELINEK_MERCER_LAMBDA: f32 = 0.7;

/// Creates a similarity with default parameters from its preset name.
///
/// # Errors
/// Returns an [`Error::invalid_arg`] if the name is not recognized.
pub fn create_similarity(name: &str) -> Result<Similarity> {
    let similarity = match SimilarityKind::try_from(name)? {
        SimilarityKind::Bm25 => Bm25Similarity::default().into(),
        SimilarityKind::TfIdf => TfIdfSimilarity::default().into(),
        SimilarityKind::DfrIn2 => {
            DfrSimilarity::new(BasicModel::In, AfterEffect::None, Normalization::h2()).into()
        }
        SimilarityKind::DfrInL2 => {
            DfrSimilarity::new(BasicModel::In, AfterEffect::L, Normalization::h2()).into()
        }
        SimilarityKind::DfrPL2 => {
            DfrSimilarity::new(BasicModel::P, AfterEffect::L, Normalization::h2()).into()
        }
        SimilarityKind::DfrIneB2 => {
            DfrSimilarity::new(BasicModel::Ine, AfterEffect::B, Normalization::h2()).into()
        }
        SimilarityKind::IbLlDf => IbSimilarity::new(
            Distribution::Ll,
            Lambda::DocumentFrequency,
            Normalization::h2(),
        )
        .into(),
        SimilarityKind::IbSplTtf => IbSimilarity::new(
            Distribution::Spl,
            Lambda::TotalTermFrequency,
            Normalization::h2(),
        )
        .into(),
        SimilarityKind::LmDirichlet => LmDirichletSimilarity::default().into(),
        SimilarityKind::LmJelinekMercer => {
            LmJelinekMercerSimilarity::new(DEFAULT_JELINEK_MERCER_LAMBDA)?.into()
        }
    };
    Ok(similarity)
}
