//! The boundary between text analysis and indexing.
//!
//! The index consumes tokens through [`TokenStream`], which it drives strictly as
//! `reset`, `increment_token` until exhausted, `end`, then `close`. [`Analyzer`]
//! produces a stream for a field's text and supplies the gaps applied when the same
//! field is added more than once.

use quarry_common::{Result, error::Error};

use crate::tokenizers::{Tokenizer, TokenizerType, create_tokenizer};

/// One token as seen by the index. Borrowed from the stream until the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'t> {
    pub term: &'t [u8],
    /// Distance from the previous token's position; `0` stacks this token on it.
    pub position_increment: u32,
    pub start_offset: i32,
    pub end_offset: i32,
}

pub trait TokenStream {
    /// Prepares the stream for consumption. Called once before the first token.
    fn reset(&mut self) -> Result<()>;

    /// Advances to the next token, or returns `None` when exhausted.
    fn increment_token(&mut self) -> Result<Option<Token<'_>>>;

    /// Finishes consumption and returns the final offset, typically the length of
    /// the input.
    fn end(&mut self) -> Result<i32>;

    /// Releases the stream's resources. Called on every path, including failures.
    fn close(&mut self) -> Result<()>;
}

pub trait Analyzer {
    fn token_stream<'a>(&'a self, field: &str, text: &'a str)
    -> Result<Box<dyn TokenStream + 'a>>;

    /// Added to the position when a field is added again.
    fn position_increment_gap(&self, _field: &str) -> i32 {
        0
    }

    /// Added to the offsets when a field is added again.
    fn offset_gap(&self, _field: &str) -> i32 {
        1
    }
}

/// An analyzer made of a tokenizer and optional lowercasing.
pub struct TokenizerAnalyzer {
    tokenizer: TokenizerType,
    lowercase: bool,
    position_increment_gap: i32,
    offset_gap: i32,
}

impl TokenizerAnalyzer {
    pub fn new(tokenizer: TokenizerType) -> TokenizerAnalyzer {
        TokenizerAnalyzer {
            tokenizer,
            lowercase: false,
            position_increment_gap: 0,
            offset_gap: 1,
        }
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn with_position_increment_gap(mut self, gap: i32) -> Self {
        self.position_increment_gap = gap;
        self
    }

    pub fn with_offset_gap(mut self, gap: i32) -> Self {
        self.offset_gap = gap;
        self
    }

    pub fn tokenizer(&self) -> &TokenizerType {
        &self.tokenizer
    }

    pub fn lowercase(&self) -> bool {
        self.lowercase
    }
}

impl Analyzer for TokenizerAnalyzer {
    fn token_stream<'a>(
        &'a self,
        _field: &str,
        text: &'a str,
    ) -> Result<Box<dyn TokenStream + 'a>> {
        Ok(Box::new(TextTokenStream {
            tokenizer: &self.tokenizer,
            text,
            lowercase: self.lowercase,
            tokens: None,
            term: String::new(),
            state: StreamState::Created,
        }))
    }

    fn position_increment_gap(&self, _field: &str) -> i32 {
        self.position_increment_gap
    }

    fn offset_gap(&self, _field: &str) -> i32 {
        self.offset_gap
    }
}

/// Creates a lowercasing analyzer over the named tokenizer.
pub fn create_analyzer(tokenizer_name: &str) -> Result<TokenizerAnalyzer> {
    Ok(TokenizerAnalyzer::new(create_tokenizer(tokenizer_name)?).with_lowercase(true))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Created,
    Consuming,
    Ended,
    Closed,
}

struct TextTokenStream<'a> {
    tokenizer: &'a TokenizerType,
    text: &'a str,
    lowercase: bool,
    tokens: Option<<TokenizerType as Tokenizer>::TokenIter<'a>>,
    term: String,
    state: StreamState,
}

impl TokenStream for TextTokenStream<'_> {
    fn reset(&mut self) -> Result<()> {
        if self.state == StreamState::Closed {
            return Err(Error::invalid_operation("reset of a closed token stream"));
        }
        self.tokens = Some(self.tokenizer.tokenize(self.text));
        self.state = StreamState::Consuming;
        Ok(())
    }

    fn increment_token(&mut self) -> Result<Option<Token<'_>>> {
        let tokens = match (self.state, self.tokens.as_mut()) {
            (StreamState::Consuming, Some(tokens)) => tokens,
            _ => {
                return Err(Error::invalid_operation(
                    "increment_token outside of reset and end",
                ));
            }
        };
        let Some((start, term)) = tokens.next() else {
            return Ok(None);
        };
        let end = start + term.len();
        let term = if self.lowercase {
            self.term.clear();
            self.term.extend(term.chars().flat_map(char::to_lowercase));
            self.term.as_str()
        } else {
            term
        };
        Ok(Some(Token {
            term: term.as_bytes(),
            position_increment: 1,
            start_offset: start as i32,
            end_offset: end as i32,
        }))
    }

    fn end(&mut self) -> Result<i32> {
        if self.state != StreamState::Consuming {
            return Err(Error::invalid_operation("end of a token stream that was not reset"));
        }
        self.state = StreamState::Ended;
        Ok(self.text.len() as i32)
    }

    fn close(&mut self) -> Result<()> {
        self.tokens = None;
        self.state = StreamState::Closed;
        Ok(())
    }
}

/// Emits every keyword as a single token. Offsets advance as if the keywords were
/// separated by one character.
pub struct KeywordTokenStream<I> {
    keywords: I,
    term: String,
    start: i32,
    last_end: i32,
}

impl<I, T> KeywordTokenStream<I>
where
    I: Iterator<Item = T>,
    T: AsRef<str>,
{
    pub fn new(keywords: impl IntoIterator<IntoIter = I>) -> KeywordTokenStream<I> {
        KeywordTokenStream {
            keywords: keywords.into_iter(),
            term: String::new(),
            start: 0,
            last_end: 0,
        }
    }
}

impl<I, T> TokenStream for KeywordTokenStream<I>
where
    I: Iterator<Item = T>,
    T: AsRef<str>,
{
    fn reset(&mut self) -> Result<()> {
        Ok(())
    }

    fn increment_token(&mut self) -> Result<Option<Token<'_>>> {
        let Some(keyword) = self.keywords.next() else {
            return Ok(None);
        };
        self.term.clear();
        self.term.push_str(keyword.as_ref());
        let len = self.term.len() as i32;
        let start_offset = self.start;
        self.last_end = start_offset + len;
        self.start += len + 1;
        Ok(Some(Token {
            term: self.term.as_bytes(),
            position_increment: 1,
            start_offset,
            end_offset: self.last_end,
        }))
    }

    fn end(&mut self) -> Result<i32> {
        Ok(self.last_end)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(stream: &mut dyn TokenStream) -> Vec<(String, i32, i32)> {
        let mut out = Vec::new();
        stream.reset().unwrap();
        while let Some(token) = stream.increment_token().unwrap() {
            out.push((
                String::from_utf8(token.term.to_vec()).unwrap(),
                token.start_offset,
                token.end_offset,
            ));
        }
        out
    }

    #[test]
    fn test_lowercasing_analyzer() {
        let analyzer = create_analyzer("unicode-word").unwrap();
        let mut stream = analyzer.token_stream("body", "Hello, WORLD").unwrap();
        let tokens = collect(stream.as_mut());
        assert_eq!(
            tokens,
            vec![("hello".to_string(), 0, 5), ("world".to_string(), 7, 12)]
        );
        assert_eq!(stream.end().unwrap(), 12);
        stream.close().unwrap();
    }

    #[test]
    fn test_protocol_order_is_enforced() {
        let analyzer = TokenizerAnalyzer::new(create_tokenizer("whitespace").unwrap());
        let mut stream = analyzer.token_stream("body", "a b").unwrap();
        assert!(stream.increment_token().is_err());
        assert!(stream.end().is_err());
        stream.reset().unwrap();
        assert!(stream.increment_token().unwrap().is_some());
        stream.close().unwrap();
        assert!(stream.reset().is_err());
    }

    #[test]
    fn test_keyword_stream_offsets() {
        let mut stream = KeywordTokenStream::new(["alpha", "be", "gamma"]);
        let tokens = collect(&mut stream);
        assert_eq!(
            tokens,
            vec![
                ("alpha".to_string(), 0, 5),
                ("be".to_string(), 6, 8),
                ("gamma".to_string(), 9, 14)
            ]
        );
        assert_eq!(stream.end().unwrap(), 14);
    }

    #[test]
    fn test_analyzer_defaults() {
        struct Plain;
        impl Analyzer for Plain {
            fn token_stream<'a>(
                &'a self,
                _field: &str,
                text: &'a str,
            ) -> Result<Box<dyn TokenStream + 'a>> {
                Ok(Box::new(KeywordTokenStream::new(std::iter::once(text))))
            }
        }
        assert_eq!(Plain.position_increment_gap("f"), 0);
        assert_eq!(Plain.offset_gap("f"), 1);
        let analyzer = create_analyzer("trivial").unwrap().with_position_increment_gap(100);
        assert_eq!(analyzer.position_increment_gap("f"), 100);
    }
}
