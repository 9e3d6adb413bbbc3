//! Read-only inverted-index view over a [`MemoryIndex`].
//!
//! The view exposes exactly one document with id `0`. Field and term lookups binary
//! search the orders computed when the reader was created.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::sync::Arc;

use quarry_collections::SliceReader;
use quarry_common::{Result, error::Error};
use quarry_similarity::{ConstantNormValues, NormSource, NormValues, Similarity};

use crate::{
    field_info::{FieldInfo, Posting},
    memory_index::MemoryIndex,
};

/// Returned by postings enumerators once they are exhausted.
pub const NO_MORE_DOCS: u32 = i32::MAX as u32;

/// Stored fields of a document. The memory index stores none.
pub type StoredDocument = Vec<(String, String)>;

struct CachedNorms {
    field: String,
    similarity: Arc<Similarity>,
    norms: Arc<dyn NormValues>,
}

pub struct MemoryIndexReader<'a> {
    index: &'a MemoryIndex,
    /// Norms of the last field asked for, together with the similarity that
    /// computed them.
    norm_cache: RefCell<Option<CachedNorms>>,
}

impl<'a> MemoryIndexReader<'a> {
    pub(crate) fn new(index: &'a MemoryIndex) -> MemoryIndexReader<'a> {
        MemoryIndexReader {
            index,
            norm_cache: RefCell::new(None),
        }
    }

    pub fn max_doc(&self) -> u32 {
        1
    }

    pub fn num_docs(&self) -> u32 {
        1
    }

    /// Always `None`: the document cannot be deleted.
    pub fn live_docs(&self) -> Option<&[bool]> {
        None
    }

    pub fn document(&self, doc: u32) -> Result<StoredDocument> {
        self.check_doc(doc)?;
        Ok(StoredDocument::new())
    }

    pub fn check_integrity(&self) -> Result<()> {
        Ok(())
    }

    pub fn delete_document(&self, _doc: u32) -> Result<()> {
        Err(Error::unsupported("delete_document on a memory index reader"))
    }

    pub fn undelete_all(&self) -> Result<()> {
        Err(Error::unsupported("undelete_all on a memory index reader"))
    }

    pub(crate) fn check_doc(&self, doc: u32) -> Result<()> {
        if doc >= self.max_doc() {
            return Err(Error::invalid_arg(
                "doc",
                format!("document {doc} is out of range, max_doc is {}", self.max_doc()),
            ));
        }
        Ok(())
    }

    /// Names of the indexed fields in ascending order.
    pub fn fields(&self) -> impl Iterator<Item = &'a str> + 'a {
        let index = self.index;
        index
            .sorted_fields
            .iter()
            .map(move |&i| index.fields[i].name.as_str())
    }

    pub fn num_fields(&self) -> usize {
        self.index.sorted_fields.len()
    }

    fn field_info(&self, field: &str) -> Option<&'a FieldInfo> {
        let index = self.index;
        let pos = index
            .sorted_fields
            .binary_search_by(|&i| index.fields[i].name.as_str().cmp(field))
            .ok()?;
        Some(&index.fields[index.sorted_fields[pos]])
    }

    /// The terms of `field`, or `None` if the field has no tokens.
    pub fn terms(&self, field: &str) -> Option<MemoryTerms<'a>> {
        self.field_info(field).map(|info| MemoryTerms {
            index: self.index,
            info,
        })
    }

    /// Encoded length norm of `field` as computed by `similarity`.
    ///
    /// The value of the most recent request is cached. A request for the same field
    /// with the same similarity instance is served from the cache.
    pub fn norm_values(
        &self,
        field: &str,
        similarity: &Arc<Similarity>,
    ) -> Result<Option<Arc<dyn NormValues>>> {
        let Some(info) = self.field_info(field) else {
            return Ok(None);
        };
        let mut cache = self.norm_cache.borrow_mut();
        let hit = cache
            .as_ref()
            .filter(|c| c.field == field && Arc::ptr_eq(&c.similarity, similarity))
            .map(|c| c.norms.clone());
        if let Some(norms) = hit {
            return Ok(Some(norms));
        }

        let norm = similarity.compute_norm(&info.invert_state());
        log::trace!("computed norm {norm} for field {field} with {similarity}");
        let norms: Arc<dyn NormValues> = Arc::new(ConstantNormValues(norm));
        *cache = Some(CachedNorms {
            field: field.to_string(),
            similarity: similarity.clone(),
            norms: norms.clone(),
        });
        Ok(Some(norms))
    }

    /// Binds the reader's norms to one similarity for scoring.
    pub fn norm_source<'r>(&'r self, similarity: &'r Arc<Similarity>) -> ReaderNorms<'r, 'a> {
        ReaderNorms {
            reader: self,
            similarity,
        }
    }
}

pub struct ReaderNorms<'r, 'a> {
    reader: &'r MemoryIndexReader<'a>,
    similarity: &'r Arc<Similarity>,
}

impl NormSource for ReaderNorms<'_, '_> {
    fn norm_values(&self, field: &str) -> Result<Option<Arc<dyn NormValues>>> {
        self.reader.norm_values(field, self.similarity)
    }
}

/// The terms of one field.
#[derive(Clone, Copy)]
pub struct MemoryTerms<'a> {
    index: &'a MemoryIndex,
    info: &'a FieldInfo,
}

impl<'a> MemoryTerms<'a> {
    pub fn size(&self) -> usize {
        self.info.terms.len()
    }

    pub fn sum_total_term_freq(&self) -> i64 {
        self.info.sum_total_term_freq
    }

    /// Every term occurs in the single document.
    pub fn sum_doc_freq(&self) -> i64 {
        self.size() as i64
    }

    pub fn doc_count(&self) -> i64 {
        if self.size() > 0 { 1 } else { 0 }
    }

    pub fn has_freqs(&self) -> bool {
        true
    }

    pub fn has_offsets(&self) -> bool {
        self.index.store_offsets()
    }

    pub fn has_positions(&self) -> bool {
        true
    }

    pub fn has_payloads(&self) -> bool {
        false
    }

    pub fn iter(&self) -> MemoryTermsEnum<'a> {
        MemoryTermsEnum {
            index: self.index,
            info: self.info,
            upto: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekStatus {
    Found,
    /// Positioned on the smallest term greater than the target.
    NotFound,
    /// The target is greater than every term.
    End,
}

/// Cursor over the terms of a field in ascending byte order.
pub struct MemoryTermsEnum<'a> {
    index: &'a MemoryIndex,
    info: &'a FieldInfo,
    /// Position in the sorted order; `None` before the first call.
    upto: Option<usize>,
}

impl<'a> MemoryTermsEnum<'a> {
    fn sorted(&self) -> &'a [u32] {
        self.info.sorted_terms(&self.index.byte_pool)
    }

    fn term_at(&self, pos: usize) -> &'a [u8] {
        self.info
            .terms
            .get(&self.index.byte_pool, self.sorted()[pos])
    }

    /// Ordinal of the current term in the field's hash.
    fn current(&self) -> Option<u32> {
        self.upto.and_then(|pos| self.sorted().get(pos).copied())
    }

    fn posting(&self) -> Option<Posting> {
        self.current()
            .map(|ord| self.info.postings[ord as usize])
    }

    /// Position of `target` in the sorted order, or the insertion point.
    fn search(&self, target: &[u8]) -> std::result::Result<usize, usize> {
        let sorted = self.sorted();
        let (mut low, mut high) = (0usize, sorted.len());
        while low < high {
            let mid = low + (high - low) / 2;
            match self.term_at(mid).cmp(target) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return Ok(mid),
            }
        }
        Err(low)
    }

    pub fn seek_exact(&mut self, term: &[u8]) -> bool {
        match self.search(term) {
            Ok(pos) => {
                self.upto = Some(pos);
                true
            }
            Err(_) => {
                self.upto = None;
                false
            }
        }
    }

    pub fn seek_ceil(&mut self, term: &[u8]) -> SeekStatus {
        match self.search(term) {
            Ok(pos) => {
                self.upto = Some(pos);
                SeekStatus::Found
            }
            Err(pos) => {
                self.upto = Some(pos);
                if pos >= self.sorted().len() {
                    SeekStatus::End
                } else {
                    SeekStatus::NotFound
                }
            }
        }
    }

    /// Positions on the term with sort rank `ord`.
    pub fn seek_exact_ord(&mut self, ord: u64) {
        debug_assert!((ord as usize) < self.sorted().len());
        self.upto = Some(ord as usize);
    }

    /// Advances to the next term, returning `None` past the last one.
    pub fn next_term(&mut self) -> Option<&'a [u8]> {
        let len = self.sorted().len();
        let pos = self.upto.map_or(0, |pos| (pos + 1).min(len));
        self.upto = Some(pos);
        (pos < len).then(|| self.term_at(pos))
    }

    pub fn term(&self) -> Option<&'a [u8]> {
        self.upto
            .filter(|&pos| pos < self.sorted().len())
            .map(|pos| self.term_at(pos))
    }

    /// Sort rank of the current term.
    pub fn ord(&self) -> Option<u64> {
        self.current().and(self.upto).map(|pos| pos as u64)
    }

    pub fn doc_freq(&self) -> i32 {
        1
    }

    pub fn total_term_freq(&self) -> Option<i64> {
        self.posting().map(|p| p.freq as i64)
    }

    pub fn docs(&self) -> Option<MemoryDocsEnum> {
        self.posting().map(|p| MemoryDocsEnum::new(p.freq))
    }

    pub fn docs_and_positions(&self) -> Option<MemoryDocsAndPositionsEnum<'a>> {
        let posting = self.posting()?;
        let mut slices = SliceReader::new(&self.index.int_pool);
        slices.reset(posting.start, posting.end);
        Some(MemoryDocsAndPositionsEnum {
            docs: MemoryDocsEnum::new(posting.freq),
            slices,
            store_offsets: self.index.store_offsets(),
            pos_upto: 0,
            start_offset: -1,
            end_offset: -1,
        })
    }
}

/// Postings of the single document: doc `0` once, then [`NO_MORE_DOCS`].
#[derive(Debug, Clone)]
pub struct MemoryDocsEnum {
    doc: Option<u32>,
    freq: u32,
}

impl MemoryDocsEnum {
    fn new(freq: u32) -> MemoryDocsEnum {
        MemoryDocsEnum { doc: None, freq }
    }

    /// `None` before the first call to [`next_doc`](Self::next_doc).
    pub fn doc_id(&self) -> Option<u32> {
        self.doc
    }

    pub fn next_doc(&mut self) -> u32 {
        let next = match self.doc {
            None => 0,
            Some(_) => NO_MORE_DOCS,
        };
        self.doc = Some(next);
        next
    }

    pub fn advance(&mut self, target: u32) -> u32 {
        loop {
            let doc = self.next_doc();
            if doc >= target || doc == NO_MORE_DOCS {
                return doc;
            }
        }
    }

    pub fn freq(&self) -> u32 {
        self.freq
    }

    pub fn cost(&self) -> u64 {
        1
    }
}

pub struct MemoryDocsAndPositionsEnum<'a> {
    docs: MemoryDocsEnum,
    slices: SliceReader<'a>,
    store_offsets: bool,
    pos_upto: u32,
    start_offset: i32,
    end_offset: i32,
}

impl MemoryDocsAndPositionsEnum<'_> {
    pub fn doc_id(&self) -> Option<u32> {
        self.docs.doc_id()
    }

    pub fn next_doc(&mut self) -> u32 {
        self.docs.next_doc()
    }

    pub fn advance(&mut self, target: u32) -> u32 {
        self.docs.advance(target)
    }

    pub fn freq(&self) -> u32 {
        self.docs.freq()
    }

    pub fn cost(&self) -> u64 {
        1
    }

    /// Decodes the next position. Must be called at most [`freq`](Self::freq) times.
    pub fn next_position(&mut self) -> i32 {
        debug_assert!(
            self.pos_upto < self.docs.freq(),
            "read {} positions of {}",
            self.pos_upto + 1,
            self.docs.freq()
        );
        self.pos_upto += 1;
        let position = self.slices.read_int();
        if self.store_offsets {
            self.start_offset = self.slices.read_int();
            self.end_offset = self.slices.read_int();
        }
        position
    }

    /// Start offset of the current position, or `-1` when offsets are not stored.
    pub fn start_offset(&self) -> i32 {
        self.start_offset
    }

    /// End offset of the current position, or `-1` when offsets are not stored.
    pub fn end_offset(&self) -> i32 {
        self.end_offset
    }

    pub fn payload(&self) -> Option<&[u8]> {
        None
    }
}
