//! Trivial Tokenizer - the input is a single term.

use std::iter;

use super::{
    DEFAULT_MAX_TERM_LENGTH, DEFAULT_MIN_TERM_LENGTH, Tokenizer, TokenizerKind, truncate_str,
};

/// Emits the whole value as one term, truncated to the maximum length.
///
/// Suited to identifiers and other values that are matched as a whole.
#[derive(Debug, Clone)]
pub struct TrivialTokenizer {
    max_term_length: usize,
    min_term_length: usize,
}

impl TrivialTokenizer {
    /// Creates a TrivialTokenizer with custom max and min term lengths.
    pub fn with_lengths(max_term_length: usize, min_term_length: usize) -> Self {
        Self {
            max_term_length,
            min_term_length,
        }
    }

    /// Creates a TrivialTokenizer with the default term lengths.
    pub fn new() -> Self {
        Self::with_lengths(DEFAULT_MAX_TERM_LENGTH, DEFAULT_MIN_TERM_LENGTH)
    }
}

/// Same as [`TrivialTokenizer::new`].
impl Default for TrivialTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for TrivialTokenizer {
    type TokenIter<'a> = iter::Take<iter::Once<(usize, &'a str)>>;

    fn tokenize<'a>(&'a self, input: &'a str) -> Self::TokenIter<'a> {
        let take = usize::from(!input.is_empty() && input.len() >= self.min_term_length);
        iter::once((0, truncate_str(input, self.max_term_length))).take(take)
    }

    fn kind(&self) -> TokenizerKind {
        TokenizerKind::Trivial
    }

    fn max_term_length(&self) -> usize {
        self.max_term_length
    }

    fn min_term_length(&self) -> usize {
        self.min_term_length
    }
}
