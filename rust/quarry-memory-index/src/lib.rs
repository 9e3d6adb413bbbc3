//! Single-document in-memory index.
//!
//! This crate indexes the fields of one transient document into pooled arenas and
//! scores that document against term and boolean queries, without any disk I/O.
//!
//! # Overview
//!
//! 1. **Analysis**: an [`Analyzer`] turns field text into a [`TokenStream`]. Streams
//!    can also be supplied directly, e.g. pre-analyzed keywords.
//! 2. **Indexing**: [`MemoryIndex::add_field`] inverts the stream into term postings.
//!    Adding the same field again continues its positions and offsets.
//! 3. **Searching**: [`MemoryIndex::create_searcher`] exposes the document through a
//!    read-only [`MemoryIndexReader`] and scores queries with a configurable
//!    [`Similarity`](quarry_similarity::Similarity).
//!
//! # Available Tokenizers
//!
//! - **Trivial Tokenizer** (`"trivial"`): the whole value as one term
//! - **Unicode Word Tokenizer** (`"unicode-word"`): words by Unicode segmentation rules
//! - **Whitespace Tokenizer** (`"whitespace"`): runs of non-whitespace characters
//!
//! # Quick Start
//!
//! ```rust
//! use quarry_memory_index::{MemoryIndex, Query, create_analyzer};
//!
//! let analyzer = create_analyzer("unicode-word").unwrap();
//! let mut index = MemoryIndex::new();
//! index.add_field_text("content", "Readings about Salmons and other fish", &analyzer).unwrap();
//!
//! assert!(index.search(&Query::term("content", "salmons")).unwrap() > 0.0);
//! assert_eq!(index.search(&Query::term("content", "trout")).unwrap(), 0.0);
//! ```

pub mod analysis;
mod field_info;
pub mod memory_index;
pub mod query;
pub mod reader;
pub mod searcher;
mod token_buffer;
pub mod tokenizers;
pub mod weight;

pub use analysis::{
    Analyzer, KeywordTokenStream, Token, TokenStream, TokenizerAnalyzer, create_analyzer,
};
pub use memory_index::{MemoryIndex, MemoryIndexConfig};
pub use query::{BooleanClause, BooleanQuery, Occur, Query, TermQuery};
pub use reader::{
    MemoryDocsAndPositionsEnum, MemoryDocsEnum, MemoryIndexReader, MemoryTerms,
    MemoryTermsEnum, NO_MORE_DOCS, SeekStatus,
};
pub use searcher::IndexSearcher;
pub use tokenizers::{Tokenizer, TokenizerKind, TokenizerType, create_tokenizer};
pub use weight::{Weight, WeightBuilder};
