//! Tokenizers for splitting field text into terms.
//!
//! A tokenizer yields `(byte_offset, term)` pairs borrowed from the input, so the
//! analysis layer can report token offsets without allocating per token.

pub mod trivial;
pub mod unicode_word;
pub mod whitespace;

use quarry_common::{Result, error::Error};
pub use trivial::TrivialTokenizer;
pub use unicode_word::UnicodeWordTokenizer;
pub use whitespace::WhitespaceTokenizer;

/// Default maximum length of a single term in bytes before truncation.
pub const DEFAULT_MAX_TERM_LENGTH: usize = 255;

/// Default minimum length of a single term in bytes.
pub const DEFAULT_MIN_TERM_LENGTH: usize = 1;

/// Extracts terms from raw text.
///
/// Terms longer than the maximum length are truncated at UTF-8 character boundaries.
/// Terms shorter than the minimum length are skipped.
pub trait Tokenizer: Send + Sync {
    /// The iterator type returned by tokenize.
    type TokenIter<'a>: Iterator<Item = (usize, &'a str)>
    where
        Self: 'a;

    /// Returns the terms of `input` with the byte offset at which each one starts.
    fn tokenize<'a>(&'a self, input: &'a str) -> Self::TokenIter<'a>;

    /// The kind of this tokenizer.
    fn kind(&self) -> TokenizerKind;

    /// The name this tokenizer is created by.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Terms longer than this many bytes are truncated.
    fn max_term_length(&self) -> usize;

    /// Terms shorter than this many bytes are skipped.
    fn min_term_length(&self) -> usize;
}

/// Creates a tokenizer from its name.
///
/// # Errors
/// Returns an [`Error::invalid_arg`] if the name is not recognized.
pub fn create_tokenizer(name: &str) -> Result<TokenizerType> {
    match name.try_into()? {
        TokenizerKind::Trivial => Ok(TokenizerType::Trivial(TrivialTokenizer::new())),
        TokenizerKind::UnicodeWord => Ok(TokenizerType::UnicodeWord(UnicodeWordTokenizer::new())),
        TokenizerKind::Whitespace => Ok(TokenizerType::Whitespace(WhitespaceTokenizer::new())),
    }
}

/// Cuts `input` to at most `max_term_length` bytes at a codepoint boundary.
pub(crate) fn truncate_str(input: &str, max_term_length: usize) -> &str {
    if input.len() <= max_term_length {
        return input;
    }
    let mut boundary = max_term_length;
    while boundary > 0 && !input.is_char_boundary(boundary) {
        boundary -= 1;
    }
    &input[..boundary]
}

/// Identifies a tokenizer by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerKind {
    /// The whole input is one term.
    Trivial,
    /// Words as delimited by the Unicode word boundary rules, punctuation dropped.
    UnicodeWord,
    /// Maximal runs of non-whitespace characters.
    Whitespace,
}

impl TryFrom<&str> for TokenizerKind {
    type Error = Error;

    fn try_from(name: &str) -> Result<Self> {
        match name {
            "trivial" => Ok(TokenizerKind::Trivial),
            "unicode-word" => Ok(TokenizerKind::UnicodeWord),
            "whitespace" => Ok(TokenizerKind::Whitespace),
            _ => Err(Error::invalid_arg(
                "name",
                format!("Unrecognized tokenizer: {name}"),
            )),
        }
    }
}

impl TokenizerKind {
    /// The name accepted by [`create_tokenizer`].
    pub const fn name(&self) -> &'static str {
        match self {
            TokenizerKind::Trivial => "trivial",
            TokenizerKind::UnicodeWord => "unicode-word",
            TokenizerKind::Whitespace => "whitespace",
        }
    }
}

/// All available tokenizers behind one type.
#[derive(Debug, Clone)]
pub enum TokenizerType {
    Trivial(TrivialTokenizer),
    UnicodeWord(UnicodeWordTokenizer),
    Whitespace(WhitespaceTokenizer),
}

/// Dispatches to the wrapped tokenizer.
impl Tokenizer for TokenizerType {
    type TokenIter<'a> = Box<dyn Iterator<Item = (usize, &'a str)> + 'a>;

    fn tokenize<'a>(&'a self, input: &'a str) -> Self::TokenIter<'a> {
        match self {
            TokenizerType::Trivial(tokenizer) => Box::new(tokenizer.tokenize(input)),
            TokenizerType::UnicodeWord(tokenizer) => Box::new(tokenizer.tokenize(input)),
            TokenizerType::Whitespace(tokenizer) => Box::new(tokenizer.tokenize(input)),
        }
    }

    fn kind(&self) -> TokenizerKind {
        match self {
            TokenizerType::Trivial(tokenizer) => tokenizer.kind(),
            TokenizerType::UnicodeWord(tokenizer) => tokenizer.kind(),
            TokenizerType::Whitespace(tokenizer) => tokenizer.kind(),
        }
    }

    fn max_term_length(&self) -> usize {
        match self {
            TokenizerType::Trivial(tokenizer) => tokenizer.max_term_length(),
            TokenizerType::UnicodeWord(tokenizer) => tokenizer.max_term_length(),
            TokenizerType::Whitespace(tokenizer) => tokenizer.max_term_length(),
        }
    }

    fn min_term_length(&self) -> usize {
        match self {
            TokenizerType::Trivial(tokenizer) => tokenizer.min_term_length(),
            TokenizerType::UnicodeWord(tokenizer) => tokenizer.min_term_length(),
            TokenizerType::Whitespace(tokenizer) => tokenizer.min_term_length(),
        }
    }
}
