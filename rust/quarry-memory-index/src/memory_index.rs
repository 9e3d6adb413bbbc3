//! A single-document inverted index held entirely in memory.
//!
//! Fields are tokenized into term postings (frequency, positions and optionally
//! offsets) stored in pooled byte and int arenas. The document can then be scored
//! against queries through [`MemoryIndex::create_searcher`], which is how the index is
//! typically used: match one incoming document against many stored queries.
//!
//! ```ignore
//! let analyzer = create_analyzer("unicode-word")?;
//! let mut index = MemoryIndex::new();
//! index.add_field_text("content", "Readings about Salmons and other fish", &analyzer)?;
//! index.add_field_text("author", "Tales of James", &analyzer)?;
//! let score = index.search(&Query::term("content", "salmons"))?;
//! ```

use std::borrow::Cow;
use std::fmt;

use ahash::AHashMap;
use quarry_collections::{
    BYTE_BLOCK_SIZE, ByteBlockPool, INT_BLOCK_SIZE, IntBlockPool, MAX_TERM_LENGTH,
    RecyclingAllocator, SliceReader,
};
use quarry_common::{Result, error::Error, error::ErrorKind, verify_arg};

use crate::{
    analysis::{Analyzer, KeywordTokenStream, TokenStream},
    field_info::FieldInfo,
    query::Query,
    reader::MemoryIndexReader,
    searcher::IndexSearcher,
    token_buffer::TokenBuffer,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryIndexConfig {
    /// Store start and end offsets next to every position.
    pub store_offsets: bool,
    /// Upper bound on the freed arena memory kept for reuse after [`MemoryIndex::reset`].
    /// Half of it is granted to byte blocks, the remainder to int blocks.
    pub max_reused_bytes: usize,
}

pub struct MemoryIndex {
    config: MemoryIndexConfig,
    pub(crate) fields: Vec<FieldInfo>,
    field_map: AHashMap<String, usize>,
    /// Indices into `fields`, ascending by name.
    pub(crate) sorted_fields: Vec<usize>,
    sorted_fields_dirty: bool,
    pub(crate) byte_pool: ByteBlockPool,
    pub(crate) int_pool: IntBlockPool,
    scratch: TokenBuffer,
}

impl Default for MemoryIndex {
    fn default() -> Self {
        MemoryIndex::new()
    }
}

impl MemoryIndex {
    pub fn new() -> MemoryIndex {
        MemoryIndex::with_config(MemoryIndexConfig::default())
    }

    pub fn with_config(config: MemoryIndexConfig) -> MemoryIndex {
        let byte_blocks = (config.max_reused_bytes / 2) / BYTE_BLOCK_SIZE;
        let int_blocks = (config.max_reused_bytes - byte_blocks * BYTE_BLOCK_SIZE)
            / (INT_BLOCK_SIZE * std::mem::size_of::<i32>());
        MemoryIndex {
            byte_pool: ByteBlockPool::new(RecyclingAllocator::new(BYTE_BLOCK_SIZE, byte_blocks)),
            int_pool: IntBlockPool::new(RecyclingAllocator::new(INT_BLOCK_SIZE, int_blocks)),
            config,
            fields: Vec::new(),
            field_map: AHashMap::new(),
            sorted_fields: Vec::new(),
            sorted_fields_dirty: false,
            scratch: TokenBuffer::new(),
        }
    }

    pub fn config(&self) -> &MemoryIndexConfig {
        &self.config
    }

    pub fn store_offsets(&self) -> bool {
        self.config.store_offsets
    }

    /// Tokenizes `text` with `analyzer` and adds the terms to field `name`, using the
    /// analyzer's gaps for repeated additions.
    pub fn add_field_text(&mut self, name: &str, text: &str, analyzer: &dyn Analyzer) -> Result<()> {
        verify_arg!(name, !name.is_empty());
        let mut stream = analyzer.token_stream(name, text)?;
        self.add_field(
            name,
            stream.as_mut(),
            1.0,
            analyzer.position_increment_gap(name),
            analyzer.offset_gap(name),
        )
    }

    /// Adds the tokens of `stream` with boost `1`, no position gap and an offset gap
    /// of one.
    pub fn add_field_stream(&mut self, name: &str, stream: &mut dyn TokenStream) -> Result<()> {
        self.add_field(name, stream, 1.0, 0, 1)
    }

    /// Adds the tokens of `stream` to field `name`.
    ///
    /// Adding a field that already exists continues it: positions resume at the last
    /// position plus `position_increment_gap`, offsets are shifted past the last offset
    /// by `offset_gap`, and the boosts multiply. A field that ends up with no tokens is
    /// not visible to readers.
    ///
    /// The stream is closed on every path. Errors raised by the stream leave the index
    /// exactly as it was before the call.
    ///
    /// # Errors
    /// - `InvalidArgument` for an empty name, a boost that is not a positive finite
    ///   number, or a term longer than [`MAX_TERM_LENGTH`].
    /// - `TokenStream` wrapping a failure of the stream itself.
    pub fn add_field(
        &mut self,
        name: &str,
        stream: &mut dyn TokenStream,
        boost: f32,
        position_increment_gap: i32,
        offset_gap: i32,
    ) -> Result<()> {
        let result = self.add_field_tokens(name, stream, boost, position_increment_gap, offset_gap);
        let closed = stream.close().map_err(|e| stream_error(name, e));
        result.and(closed)
    }

    fn add_field_tokens(
        &mut self,
        name: &str,
        stream: &mut dyn TokenStream,
        boost: f32,
        position_increment_gap: i32,
        offset_gap: i32,
    ) -> Result<()> {
        verify_arg!(name, !name.is_empty());
        verify_arg!(boost, boost.is_finite() && boost > 0.0);

        self.scratch.clear();
        buffer_tokens(name, stream, &mut self.scratch)?;

        let store_offsets = self.config.store_offsets;
        match self.field_map.get(name).copied() {
            Some(index) => {
                let info = &mut self.fields[index];
                let position = info.last_position + position_increment_gap;
                let offset = info.last_offset + offset_gap;
                info.invert(
                    &self.scratch,
                    &mut self.byte_pool,
                    &mut self.int_pool,
                    store_offsets,
                    position,
                    offset,
                    boost,
                )?;
            }
            None => {
                let mut info = FieldInfo::new(name);
                info.invert(
                    &self.scratch,
                    &mut self.byte_pool,
                    &mut self.int_pool,
                    store_offsets,
                    -1,
                    0,
                    boost,
                )?;
                if info.num_tokens == 0 {
                    log::debug!("field {name} has no tokens and is not published");
                    return Ok(());
                }
                self.field_map.insert(name.to_string(), self.fields.len());
                self.fields.push(info);
                self.sorted_fields_dirty = true;
            }
        }
        log::debug!("added {} tokens to field {name}", self.scratch.len());
        Ok(())
    }

    /// A stream emitting every keyword as one untokenized term.
    pub fn keyword_token_stream<I, T>(keywords: I) -> KeywordTokenStream<I::IntoIter>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        KeywordTokenStream::new(keywords)
    }

    /// Sorts fields so that readers can binary search them. Terms are sorted per
    /// field on first access.
    fn prepare_for_reading(&mut self) {
        if self.sorted_fields_dirty {
            let fields = &self.fields;
            let mut sorted: Vec<usize> = (0..fields.len()).collect();
            sorted.sort_by(|&a, &b| fields[a].name.cmp(&fields[b].name));
            self.sorted_fields = sorted;
            self.sorted_fields_dirty = false;
        }
    }

    /// A read-only view of the document.
    pub fn create_reader(&mut self) -> MemoryIndexReader<'_> {
        self.prepare_for_reading();
        MemoryIndexReader::new(self)
    }

    /// A searcher over the document, using the default similarity.
    ///
    /// The searcher borrows the index; fields added later are only visible to a
    /// new searcher.
    pub fn create_searcher(&mut self) -> IndexSearcher<'_> {
        IndexSearcher::new(self.create_reader())
    }

    /// Scores the document against `query` with the default similarity.
    /// Returns `0.0` when it does not match.
    pub fn search(&mut self, query: &Query) -> Result<f32> {
        self.create_searcher().score(query)
    }

    /// Removes all fields. Arena blocks go back to their allocators; int blocks are
    /// zeroed as slice chains depend on it.
    pub fn reset(&mut self) {
        let num_fields = self.fields.len();
        self.fields.clear();
        self.field_map.clear();
        self.sorted_fields.clear();
        self.sorted_fields_dirty = false;
        self.byte_pool.reset(false, false);
        self.int_pool.reset(true, false);
        log::debug!("memory index reset, {num_fields} fields dropped");
    }

    /// Best-effort estimate of the memory retained by the index, in bytes.
    pub fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.byte_pool.bytes_used()
            + self.int_pool.bytes_used()
            + self.fields.iter().map(FieldInfo::memory_size).sum::<usize>()
            + self.field_map.capacity()
                * (std::mem::size_of::<String>() + std::mem::size_of::<usize>())
            + self.sorted_fields.capacity() * std::mem::size_of::<usize>()
            + self.scratch.memory_size()
    }

    fn fields_in_order(&self) -> Cow<'_, [usize]> {
        if self.sorted_fields_dirty {
            let mut sorted: Vec<usize> = (0..self.fields.len()).collect();
            sorted.sort_by(|&a, &b| self.fields[a].name.cmp(&self.fields[b].name));
            Cow::Owned(sorted)
        } else {
            Cow::Borrowed(&self.sorted_fields)
        }
    }
}

fn buffer_tokens(field: &str, stream: &mut dyn TokenStream, buffer: &mut TokenBuffer) -> Result<()> {
    stream.reset().map_err(|e| stream_error(field, e))?;
    while let Some(token) = stream.increment_token().map_err(|e| stream_error(field, e))? {
        if token.term.len() > MAX_TERM_LENGTH {
            return Err(Error::invalid_arg(
                "term",
                format!(
                    "term of {} bytes in field {field} exceeds the maximum of {MAX_TERM_LENGTH}",
                    token.term.len()
                ),
            ));
        }
        buffer.push(&token);
    }
    let final_offset = stream.end().map_err(|e| stream_error(field, e))?;
    buffer.set_final_offset(final_offset);
    Ok(())
}

fn stream_error(field: &str, e: Error) -> Error {
    match e.kind() {
        ErrorKind::TokenStream { .. } => e,
        _ => Error::token_stream(format!("field {field}"), e),
    }
}

impl fmt::Display for MemoryIndex {
    /// Dumps every field, term, frequency and position list.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut total_terms = 0;
        let mut total_positions = 0;
        let mut reader = SliceReader::new(&self.int_pool);
        let stride = if self.config.store_offsets { 3 } else { 1 };
        for &index in self.fields_in_order().iter() {
            let info = &self.fields[index];
            writeln!(f, "{}:", info.name)?;
            let mut positions = 0;
            let ords = info.sorted_terms(&self.byte_pool);
            for &ord in ords {
                let term = info.terms.get(&self.byte_pool, ord);
                let posting = info.postings[ord as usize];
                write!(f, "\t'{}':{}:[", String::from_utf8_lossy(term), posting.freq)?;
                reader.reset(posting.start, posting.end);
                let mut first = true;
                while !reader.end_of_slice() {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    let position = reader.read_int();
                    if stride == 3 {
                        let start = reader.read_int();
                        let end = reader.read_int();
                        write!(f, "{position}({start}-{end})")?;
                    } else {
                        write!(f, "{position}")?;
                    }
                }
                writeln!(f, "]")?;
                positions += posting.freq as usize;
            }
            writeln!(f, "\tterms={}, positions={positions}", ords.len())?;
            total_terms += ords.len();
            total_positions += positions;
        }
        write!(
            f,
            "fields={}, terms={total_terms}, positions={total_positions}, memory={}",
            self.fields.len(),
            self.memory_size()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Token, create_analyzer};

    struct FailingStream {
        tokens_before_failure: usize,
        emitted: usize,
        closed: bool,
    }

    impl TokenStream for FailingStream {
        fn reset(&mut self) -> Result<()> {
            Ok(())
        }

        fn increment_token(&mut self) -> Result<Option<Token<'_>>> {
            if self.emitted == self.tokens_before_failure {
                return Err(Error::io(
                    "reader",
                    std::io::Error::other("connection dropped"),
                ));
            }
            self.emitted += 1;
            Ok(Some(Token {
                term: b"partial",
                position_increment: 1,
                start_offset: 0,
                end_offset: 7,
            }))
        }

        fn end(&mut self) -> Result<i32> {
            Ok(0)
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    /// The dump minus the trailing memory estimate, which moves with scratch capacity.
    fn dump_without_memory(index: &MemoryIndex) -> String {
        let dump = index.to_string();
        match dump.rsplit_once(", memory=") {
            Some((head, _)) => head.to_string(),
            None => dump,
        }
    }

    #[test]
    fn test_failing_stream_leaves_index_untouched() {
        let analyzer = create_analyzer("whitespace").unwrap();
        let mut index = MemoryIndex::new();
        index.add_field_text("body", "a b", &analyzer).unwrap();
        let before = dump_without_memory(&index);

        let mut stream = FailingStream {
            tokens_before_failure: 3,
            emitted: 0,
            closed: false,
        };
        let err = index.add_field("body", &mut stream, 2.0, 0, 1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TokenStream { .. }));
        assert!(stream.closed);
        assert_eq!(dump_without_memory(&index), before);
        assert_eq!(index.fields[0].boost, 1.0);

        let mut stream = FailingStream {
            tokens_before_failure: 1,
            emitted: 0,
            closed: false,
        };
        assert!(index.add_field("fresh", &mut stream, 1.0, 0, 1).is_err());
        assert!(!index.field_map.contains_key("fresh"));
    }

    #[test]
    fn test_arguments_are_checked_and_stream_closed() {
        let mut index = MemoryIndex::new();
        for (name, boost) in [("", 1.0), ("body", 0.0), ("body", -1.0), ("body", f32::NAN)] {
            let mut stream = FailingStream {
                tokens_before_failure: 1,
                emitted: 0,
                closed: false,
            };
            let err = index.add_field(name, &mut stream, boost, 0, 1).unwrap_err();
            assert!(err.is_invalid_arg(), "{name} {boost}");
            assert!(stream.closed);
            assert_eq!(stream.emitted, 0);
        }
        assert!(index.fields.is_empty());
    }

    #[test]
    fn test_oversized_term_is_rejected() {
        let mut index = MemoryIndex::new();
        let huge = "x".repeat(MAX_TERM_LENGTH + 1);
        let mut stream = MemoryIndex::keyword_token_stream(["ok", huge.as_str()]);
        assert!(index.add_field_stream("body", &mut stream).unwrap_err().is_invalid_arg());
        assert!(index.fields.is_empty());
    }

    #[test]
    fn test_reuse_budget_is_split_between_pools() {
        let config = MemoryIndexConfig {
            store_offsets: false,
            max_reused_bytes: 4 * BYTE_BLOCK_SIZE,
        };
        let index = MemoryIndex::with_config(config);
        assert_eq!(index.config().max_reused_bytes, 4 * BYTE_BLOCK_SIZE);
        assert!(!index.store_offsets());
    }

    #[test]
    fn test_display_dump() {
        let analyzer = create_analyzer("whitespace").unwrap();
        let mut index = MemoryIndex::with_config(MemoryIndexConfig {
            store_offsets: true,
            max_reused_bytes: 0,
        });
        index.add_field_text("title", "b a b", &analyzer).unwrap();
        let dump = index.to_string();
        assert!(dump.starts_with("title:\n\t'a':1:[1(2-3)]\n\t'b':2:[0(0-1), 2(4-5)]\n"), "{dump}");
        assert!(dump.contains("\tterms=2, positions=3\n"));
        assert!(dump.contains("fields=1, terms=2, positions=3"));
    }

    #[test]
    fn test_reset_and_reuse() {
        let analyzer = create_analyzer("whitespace").unwrap();
        let mut index = MemoryIndex::with_config(MemoryIndexConfig {
            store_offsets: false,
            max_reused_bytes: 1 << 20,
        });
        index.add_field_text("body", "one two three", &analyzer).unwrap();
        let used = index.memory_size();
        index.reset();
        assert!(index.fields.is_empty());
        assert!(index.memory_size() < used);

        index.add_field_text("body", "four", &analyzer).unwrap();
        let dump = index.to_string();
        assert!(dump.starts_with("body:\n\t'four':1:[0]\n"), "{dump}");
    }
}
