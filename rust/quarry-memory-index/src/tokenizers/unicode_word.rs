//! Unicode Word Tokenizer - splits text at Unicode word boundaries.

use unicode_segmentation::{UnicodeSegmentation, UnicodeWordIndices};

use super::{
    DEFAULT_MAX_TERM_LENGTH, DEFAULT_MIN_TERM_LENGTH, Tokenizer, TokenizerKind, truncate_str,
};

/// Extracts words following the UAX #29 word boundary rules. Segments made of
/// punctuation or whitespace only are dropped.
#[derive(Debug, Clone)]
pub struct UnicodeWordTokenizer {
    max_term_length: usize,
    min_term_length: usize,
}

impl UnicodeWordTokenizer {
    /// Creates a UnicodeWordTokenizer with custom max and min term lengths.
    pub fn with_lengths(max_term_length: usize, min_term_length: usize) -> Self {
        Self {
            max_term_length,
            min_term_length,
        }
    }

    /// Creates a UnicodeWordTokenizer with the default term lengths.
    pub fn new() -> Self {
        Self::with_lengths(DEFAULT_MAX_TERM_LENGTH, DEFAULT_MIN_TERM_LENGTH)
    }
}

/// Same as [`UnicodeWordTokenizer::new`].
impl Default for UnicodeWordTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the words of one input, with short words skipped and long ones
/// truncated.
pub struct WordTokenIterator<'a> {
    words: UnicodeWordIndices<'a>,
    max_term_length: usize,
    min_term_length: usize,
}

impl<'a> Iterator for WordTokenIterator<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let min = self.min_term_length;
        let (start, word) = self.words.by_ref().find(|(_, word)| word.len() >= min)?;
        Some((start, truncate_str(word, self.max_term_length)))
    }
}

impl Tokenizer for UnicodeWordTokenizer {
    type TokenIter<'a> = WordTokenIterator<'a>;

    fn tokenize<'a>(&'a self, input: &'a str) -> Self::TokenIter<'a> {
        WordTokenIterator {
            words: input.unicode_word_indices(),
            max_term_length: self.max_term_length,
            min_term_length: self.min_term_length,
        }
    }

    fn kind(&self) -> TokenizerKind {
        TokenizerKind::UnicodeWord
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

    fn terms<'a>(tokenizer: &'a UnicodeWordTokenizer, input: &'a str) -> Vec<&'a str> {
        tokenizer.tokenize(input).map(|(_, term)| term).collect()
    }

    #[test]
    fn test_unicode_word_tokenizer() {
        let tokenizer = UnicodeWordTokenizer::new();
        assert_eq!(
            terms(&tokenizer, "Typically 3-4 levels deep,"),
            vec!["Typically", "3", "4", "levels", "deep"]
        );
        assert!(terms(&tokenizer, "").is_empty());
        assert!(terms(&tokenizer, "!@#$%^&*()").is_empty());
        assert_eq!(
            terms(&tokenizer, "café naïve résumé"),
            vec!["café", "naïve", "résumé"]
        );
        assert_eq!(tokenizer.name(), "unicode-word");
    }

    #[test]
    fn test_offsets_are_byte_positions() {
        let tokenizer = UnicodeWordTokenizer::new();
        let tokens: Vec<_> = tokenizer.tokenize("über, alles").collect();
        assert_eq!(tokens, vec![(0, "über"), (7, "alles")]);
    }

    #[test]
    fn test_length_limits() {
        let tokenizer = UnicodeWordTokenizer::with_lengths(3, 2);
        assert_eq!(
            terms(&tokenizer, "a cat elephant mouse"),
            vec!["cat", "ele", "mou"]
        );
    }
}
