//! Relevance scoring models.
//!
//! A [`Similarity`] turns term and collection statistics into scores. It is used at
//! two points in time:
//!
//! - **Indexing**: [`Similarity::compute_norm`] encodes each field's length into a one
//!   byte norm (see [`small_float`]).
//! - **Searching**: [`Similarity::compute_weight`] computes the per-query part once, and
//!   the [`SimScorer`] obtained from [`Similarity::sim_scorer`] combines it with the term
//!   frequency and decoded norm of every matching document.
//!
//! # Available Models
//!
//! - **BM25** (`"bm25"`)
//! - **Classic TF-IDF** (`"tfidf"`, `"default"`)
//! - **Divergence from randomness** (`"dfr-in2"`, `"dfr-inl2"`, `"dfr-pl2"`, `"dfr-ineb2"`)
//! - **Information-based** (`"ib-ll-df"`, `"ib-spl-ttf"`)
//! - **Language models** (`"lm-dirichlet"`, `"lm-jelinek-mercer"`)

mod base;
pub mod bm25;
pub mod dfr;
pub mod explanation;
pub mod ib;
pub mod lm;
pub mod normalization;
pub mod norms;
pub mod similarity;
pub mod small_float;
pub mod stats;
pub mod tfidf;

pub use base::BaseScorer;
pub use bm25::Bm25Similarity;
pub use dfr::{AfterEffect, BasicModel, DfrSimilarity};
pub use explanation::Explanation;
pub use ib::{Distribution, IbSimilarity, Lambda};
pub use lm::{LmDirichletSimilarity, LmJelinekMercerSimilarity};
pub use normalization::Normalization;
pub use norms::{ConstantNormValues, NoNorms, NormSource, NormValues};
pub use similarity::{
    SimScorer, SimWeight, SimWeightBuilder, Similarity, SimilarityKind, create_similarity,
};
pub use stats::{BasicStats, CollectionStatistics, FieldInvertState, TermStatistics};
pub use tfidf::TfIdfSimilarity;
