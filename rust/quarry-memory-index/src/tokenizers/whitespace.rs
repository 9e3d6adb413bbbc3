//! Whitespace Tokenizer - terms are maximal runs of non-whitespace characters.

use std::str::CharIndices;

use super::{
    DEFAULT_MAX_TERM_LENGTH, DEFAULT_MIN_TERM_LENGTH, Tokenizer, TokenizerKind, truncate_str,
};

/// Splits text at Unicode whitespace, keeping punctuation attached to its term.
///
/// Suited to pre-normalized text and to tests that need predictable tokens.
#[derive(Debug, Clone)]
pub struct WhitespaceTokenizer {
    max_term_length: usize,
    min_term_length: usize,
}

impl WhitespaceTokenizer {
    /// Creates a WhitespaceTokenizer with custom max and min term lengths.
    pub fn with_lengths(max_term_length: usize, min_term_length: usize) -> Self {
        Self {
            max_term_length,
            min_term_length,
        }
    }

    /// Creates a WhitespaceTokenizer with the default term lengths.
    pub fn new() -> Self {
        Self::with_lengths(DEFAULT_MAX_TERM_LENGTH, DEFAULT_MIN_TERM_LENGTH)
    }
}

/// Same as [`WhitespaceTokenizer::new`].
impl Default for WhitespaceTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the whitespace-separated terms of one input.
pub struct WhitespaceTokenIterator<'a> {
    input: &'a str,
    char_indices: CharIndices<'a>,
    max_term_length: usize,
    min_term_length: usize,
}

impl<'a> Iterator for WhitespaceTokenIterator<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut start = None;
            let mut end = self.input.len();
            for (pos, ch) in self.char_indices.by_ref() {
                if !ch.is_whitespace() {
                    start.get_or_insert(pos);
                } else if start.is_some() {
                    end = pos;
                    break;
                }
            }
            let start = start?;
            let term = &self.input[start..end];
            if term.len() >= self.min_term_length {
                return Some((start, truncate_str(term, self.max_term_length)));
            }
        }
    }
}

impl Tokenizer for WhitespaceTokenizer {
    type TokenIter<'a> = WhitespaceTokenIterator<'a>;

    fn tokenize<'a>(&'a self, input: &'a str) -> Self::TokenIter<'a> {
        WhitespaceTokenIterator {
            input,
            char_indices: input.char_indices(),
            max_term_length: self.max_term_length,
            min_term_length: self.min_term_length,
        }
    }

    fn kind(&self) -> TokenizerKind {
        TokenizerKind::Whitespace
    }

    fn max_term_length(&self) -> usize {
        self.max_term_length
    }

    fn min_term_length(&self) -> usize {
        self.min_term_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_tokenizer() {
        let tokenizer = WhitespaceTokenizer::new();
        let tokens: Vec<_> = tokenizer.tokenize("  foo-bar\tbaz,\n qux ").collect();
        assert_eq!(tokens, vec![(2, "foo-bar"), (10, "baz,"), (16, "qux")]);
        assert_eq!(tokenizer.tokenize(" \t\n").count(), 0);
        assert_eq!(tokenizer.name(), "whitespace");
    }

    #[test]
    fn test_short_terms_are_skipped() {
        let tokenizer = WhitespaceTokenizer::with_lengths(4, 2);
        let tokens: Vec<_> = tokenizer.tokenize("a bb c elephant").collect();
        assert_eq!(tokens, vec![(2, "bb"), (7, "elep")]);
    }
}
