//! Inverted state of one field of the in-memory document.

use std::cell::OnceCell;

use quarry_collections::{ByteBlockPool, BytesRefHash, IntBlockPool, SliceWriter, TermOrd};
use quarry_common::Result;
use quarry_similarity::FieldInvertState;

use crate::token_buffer::TokenBuffer;

/// Where the positions of one term live in the int pool, and how many there are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Posting {
    pub start: u32,
    pub end: u32,
    pub freq: u32,
}

pub(crate) struct FieldInfo {
    pub name: String,
    pub terms: BytesRefHash,
    /// Indexed by term ordinal.
    pub postings: Vec<Posting>,
    pub num_tokens: i32,
    pub num_overlap_tokens: i32,
    pub boost: f32,
    pub sum_total_term_freq: i64,
    pub last_position: i32,
    pub last_offset: i32,
    /// Term ordinals in byte order, computed on first read and dropped when a new
    /// term arrives.
    sorted_terms: OnceCell<Vec<u32>>,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>) -> FieldInfo {
        FieldInfo {
            name: name.into(),
            terms: BytesRefHash::new(),
            postings: Vec::new(),
            num_tokens: 0,
            num_overlap_tokens: 0,
            boost: 1.0,
            sum_total_term_freq: 0,
            last_position: -1,
            last_offset: 0,
            sorted_terms: OnceCell::new(),
        }
    }

    /// Inverts buffered tokens into this field.
    ///
    /// `position` and `offset` are the running position and the offset base for this
    /// batch: `-1` and `0` for a field's first addition, the previous values plus the
    /// gaps otherwise.
    #[allow(clippy::too_many_arguments)]
    pub fn invert(
        &mut self,
        tokens: &TokenBuffer,
        byte_pool: &mut ByteBlockPool,
        int_pool: &mut IntBlockPool,
        store_offsets: bool,
        mut position: i32,
        offset: i32,
        boost: f32,
    ) -> Result<()> {
        let mut writer = SliceWriter::new(int_pool);
        for token in tokens.iter() {
            self.num_tokens += 1;
            if token.position_increment == 0 {
                self.num_overlap_tokens += 1;
            }
            position += token.position_increment as i32;

            let ord = match self.terms.add(byte_pool, token.term)? {
                TermOrd::New(ord) => {
                    let start = writer.start_new_slice()?;
                    self.postings.push(Posting {
                        start,
                        end: start,
                        freq: 0,
                    });
                    self.sorted_terms.take();
                    ord
                }
                TermOrd::Existing(ord) => {
                    writer.reset(self.postings[ord as usize].end);
                    ord
                }
            };
            debug_assert_eq!(self.postings.len(), self.terms.len());

            writer.write_int(position)?;
            if store_offsets {
                writer.write_int(token.start_offset + offset)?;
                writer.write_int(token.end_offset + offset)?;
            }
            let posting = &mut self.postings[ord as usize];
            posting.freq += 1;
            posting.end = writer.current_offset();
            self.sum_total_term_freq += 1;
        }
        self.boost *= boost;
        self.last_position = position;
        self.last_offset = tokens.final_offset() + offset;
        Ok(())
    }

    /// Term ordinals in ascending byte order. Sorted on the first call after a new
    /// term was added; later calls reuse that order.
    pub fn sorted_terms(&self, byte_pool: &ByteBlockPool) -> &[u32] {
        self.sorted_terms
            .get_or_init(|| self.terms.sort(byte_pool, |a, b| a.cmp(b)))
    }

    pub fn invert_state(&self) -> FieldInvertState {
        FieldInvertState::new(
            self.name.as_str(),
            self.num_tokens,
            self.num_overlap_tokens,
            self.boost,
        )
    }

    pub fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.name.capacity()
            + self.terms.memory_size()
            + self.postings.capacity() * std::mem::size_of::<Posting>()
            + self
                .sorted_terms
                .get()
                .map_or(0, |ords| ords.capacity() * std::mem::size_of::<u32>())
    }
}
