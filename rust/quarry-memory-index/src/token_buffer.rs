//! Reusable scratch storage for the tokens of one `add_field` call.
//!
//! Tokens are collected here first and inverted only after the stream has ended
//! successfully, so a failing stream never leaves a field half-indexed.

use crate::analysis::Token;

#[derive(Debug, Clone, Copy)]
struct Entry {
    term_start: usize,
    term_len: usize,
    position_increment: u32,
    start_offset: i32,
    end_offset: i32,
}

#[derive(Debug, Default)]
pub(crate) struct TokenBuffer {
    terms: Vec<u8>,
    entries: Vec<Entry>,
    final_offset: i32,
}

impl TokenBuffer {
    pub fn new() -> TokenBuffer {
        TokenBuffer::default()
    }

    /// Empties the buffer, keeping its capacity.
    pub fn clear(&mut self) {
        self.terms.clear();
        self.entries.clear();
        self.final_offset = 0;
    }

    pub fn push(&mut self, token: &Token<'_>) {
        self.entries.push(Entry {
            term_start: self.terms.len(),
            term_len: token.term.len(),
            position_increment: token.position_increment,
            start_offset: token.start_offset,
            end_offset: token.end_offset,
        });
        self.terms.extend_from_slice(token.term);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn final_offset(&self) -> i32 {
        self.final_offset
    }

    pub fn set_final_offset(&mut self, offset: i32) {
        self.final_offset = offset;
    }

    pub fn iter(&self) -> impl Iterator<Item = Token<'_>> + '_ {
        self.entries.iter().map(|e| Token {
            term: &self.terms[e.term_start..e.term_start + e.term_len],
            position_increment: e.position_increment,
            start_offset: e.start_offset,
            end_offset: e.end_offset,
        })
    }

    pub fn memory_size(&self) -> usize {
        self.terms.capacity() + self.entries.capacity() * std::mem::size_of::<Entry>()
    }
}
