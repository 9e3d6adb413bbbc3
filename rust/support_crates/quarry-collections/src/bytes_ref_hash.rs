use std::cmp::Ordering;

use quarry_common::{Result, error::Error};

use crate::byte_block_pool::{BYTE_BLOCK_SIZE, ByteBlockPool};

/// Default number of hash slots of a freshly created hash.
pub const DEFAULT_CAPACITY: usize = 16;

/// Longest term that fits into one byte block together with its length prefix.
pub const MAX_TERM_LENGTH: usize = BYTE_BLOCK_SIZE - 2;

const EMPTY: i32 = -1;

/// Outcome of [`BytesRefHash::add`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TermOrd {
    /// The term was inserted and received this ordinal.
    New(u32),
    /// The term was already present under this ordinal.
    Existing(u32),
}

impl TermOrd {
    pub fn ord(&self) -> u32 {
        match *self {
            TermOrd::New(ord) | TermOrd::Existing(ord) => ord,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, TermOrd::New(_))
    }

    /// Classic single-integer encoding: the ordinal for a new term,
    /// `-(ordinal) - 1` for an existing one.
    pub fn encoded(&self) -> i32 {
        match *self {
            TermOrd::New(ord) => ord as i32,
            TermOrd::Existing(ord) => -(ord as i32) - 1,
        }
    }
}

/// A set of distinct byte sequences mapped to dense ordinals `[0, N)`.
///
/// The term bytes live in a caller-owned [`ByteBlockPool`], which lets many hashes
/// (one per field) share a single arena. Each term is stored as a one- or two-byte
/// length prefix followed by the bytes, always inside one block, so lookups by
/// ordinal borrow straight from the arena.
///
/// The hash table uses open addressing with linear probing over a power-of-two slot
/// array and is rebuilt at double size when half of the slots are taken. Probes
/// compare the cached 32-bit hash first and then the full bytes, so colliding
/// hashes never produce a false match.
///
/// # Limitations
/// - Term removal is not supported
/// - Terms longer than [`MAX_TERM_LENGTH`] are rejected
pub struct BytesRefHash {
    /// Slot array: ordinal or `EMPTY`.
    ids: Vec<i32>,
    /// Arena offset of each term's length prefix, indexed by ordinal.
    bytes_start: Vec<u32>,
    /// Cached hash of each term, indexed by ordinal.
    hashes: Vec<u32>,
    hash_mask: usize,
    hash_half_size: usize,
}

impl Default for BytesRefHash {
    fn default() -> Self {
        Self::new()
    }
}

impl BytesRefHash {
    pub fn new() -> BytesRefHash {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a hash with `capacity` slots, rounded up to a power of two.
    pub fn with_capacity(capacity: usize) -> BytesRefHash {
        let size = capacity.max(2).next_power_of_two();
        BytesRefHash {
            ids: vec![EMPTY; size],
            bytes_start: Vec::with_capacity(size / 2),
            hashes: Vec::with_capacity(size / 2),
            hash_mask: size - 1,
            hash_half_size: size / 2,
        }
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.bytes_start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_start.is_empty()
    }

    #[inline]
    fn hash_term(term: &[u8]) -> u32 {
        xxhash_rust::xxh3::xxh3_64(term) as u32
    }

    /// Inserts a term, or reports the ordinal it already has.
    pub fn add(&mut self, pool: &mut ByteBlockPool, term: &[u8]) -> Result<TermOrd> {
        if term.len() > MAX_TERM_LENGTH {
            return Err(Error::invalid_arg(
                "term",
                format!(
                    "term length {} exceeds the maximum of {MAX_TERM_LENGTH} bytes",
                    term.len()
                ),
            ));
        }
        let hash = Self::hash_term(term);
        let slot = self.probe(pool, term, hash);
        let id = self.ids[slot];
        if id != EMPTY {
            return Ok(TermOrd::Existing(id as u32));
        }

        let ord = self.bytes_start.len() as u32;
        let start = Self::store_term(pool, term)?;
        self.bytes_start.push(start);
        self.hashes.push(hash);
        self.ids[slot] = ord as i32;
        if self.len() == self.hash_half_size {
            self.rehash(2 * self.ids.len());
        }
        Ok(TermOrd::New(ord))
    }

    /// Looks up a term without inserting it.
    pub fn find(&self, pool: &ByteBlockPool, term: &[u8]) -> Option<u32> {
        let id = self.ids[self.probe(pool, term, Self::hash_term(term))];
        (id != EMPTY).then_some(id as u32)
    }

    /// Returns the bytes of the term with the given ordinal.
    ///
    /// # Panics
    /// Panics if the ordinal is out of bounds.
    pub fn get<'p>(&self, pool: &'p ByteBlockPool, ord: u32) -> &'p [u8] {
        let start = self.bytes_start[ord as usize] as usize;
        let (len, prefix) = Self::read_length(pool, start);
        pool.slice(start + prefix, len)
    }

    /// Computes the ordinal permutation that visits terms in `compare` order.
    ///
    /// The hash itself is left intact; callers that query the order repeatedly
    /// are expected to cache the result until new terms are added.
    pub fn sort<F>(&self, pool: &ByteBlockPool, mut compare: F) -> Vec<u32>
    where
        F: FnMut(&[u8], &[u8]) -> Ordering,
    {
        let mut ords: Vec<u32> = (0..self.len() as u32).collect();
        ords.sort_by(|&a, &b| compare(self.get(pool, a), self.get(pool, b)));
        ords
    }

    /// Removes all terms. The arena bytes are not reclaimed; reset the pool for that.
    pub fn clear(&mut self) {
        self.ids.fill(EMPTY);
        self.bytes_start.clear();
        self.hashes.clear();
    }

    /// Approximate heap footprint of the table and per-ordinal arrays.
    pub fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.ids.capacity() * std::mem::size_of::<i32>()
            + self.bytes_start.capacity() * std::mem::size_of::<u32>()
            + self.hashes.capacity() * std::mem::size_of::<u32>()
    }

    /// Finds the slot holding `term`, or the empty slot where it would go.
    fn probe(&self, pool: &ByteBlockPool, term: &[u8], hash: u32) -> usize {
        let mut slot = hash as usize & self.hash_mask;
        loop {
            let id = self.ids[slot];
            if id == EMPTY
                || (self.hashes[id as usize] == hash && self.get(pool, id as u32) == term)
            {
                return slot;
            }
            slot = (slot + 1) & self.hash_mask;
        }
    }

    fn rehash(&mut self, new_size: usize) {
        debug_assert!(new_size.is_power_of_two());
        let new_mask = new_size - 1;
        let mut ids = vec![EMPTY; new_size];
        for (ord, &hash) in self.hashes.iter().enumerate() {
            let mut slot = hash as usize & new_mask;
            while ids[slot] != EMPTY {
                slot = (slot + 1) & new_mask;
            }
            ids[slot] = ord as i32;
        }
        self.ids = ids;
        self.hash_mask = new_mask;
        self.hash_half_size = new_size / 2;
    }

    fn store_term(pool: &mut ByteBlockPool, term: &[u8]) -> Result<u32> {
        let len = term.len();
        let prefix = if len < 128 { 1 } else { 2 };
        let start = pool.allocate(len + prefix)?;
        let dst = pool.slice_mut(start, len + prefix);
        if prefix == 1 {
            dst[0] = len as u8;
        } else {
            dst[0] = 0x80 | (len & 0x7f) as u8;
            dst[1] = (len >> 7) as u8;
        }
        dst[prefix..].copy_from_slice(term);
        Ok(start as u32)
    }

    /// Decodes a length prefix, returning `(length, prefix_size)`.
    #[inline]
    fn read_length(pool: &ByteBlockPool, start: usize) -> (usize, usize) {
        let first = pool.byte_at(start);
        if first & 0x80 == 0 {
            (first as usize, 1)
        } else {
            let second = pool.byte_at(start + 1);
            ((first & 0x7f) as usize | ((second as usize) << 7), 2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut pool = ByteBlockPool::direct();
        let mut hash = BytesRefHash::new();
        assert_eq!(hash.add(&mut pool, b"cc").unwrap(), TermOrd::New(0));
        assert_eq!(hash.add(&mut pool, b"dd").unwrap(), TermOrd::New(1));
        assert_eq!(hash.add(&mut pool, b"").unwrap(), TermOrd::New(2));
        assert_eq!(hash.get(&pool, 0), b"cc");
        assert_eq!(hash.get(&pool, 1), b"dd");
        assert_eq!(hash.get(&pool, 2), b"");
        assert_eq!(hash.len(), 3);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut pool = ByteBlockPool::direct();
        let mut hash = BytesRefHash::new();
        let first = hash.add(&mut pool, b"lucene").unwrap();
        let second = hash.add(&mut pool, b"lucene").unwrap();
        assert!(first.is_new());
        assert_eq!(second, TermOrd::Existing(first.ord()));
        assert_eq!(second.encoded(), -(first.ord() as i32) - 1);
        assert_eq!(hash.len(), 1);
    }

    #[test]
    fn test_long_terms_use_two_byte_prefix() {
        let mut pool = ByteBlockPool::direct();
        let mut hash = BytesRefHash::new();
        let long = vec![b'x'; 300];
        let ord = hash.add(&mut pool, &long).unwrap().ord();
        assert_eq!(hash.get(&pool, ord), long.as_slice());

        let max = vec![b'y'; MAX_TERM_LENGTH];
        let ord = hash.add(&mut pool, &max).unwrap().ord();
        assert_eq!(hash.get(&pool, ord).len(), MAX_TERM_LENGTH);

        let too_long = vec![b'z'; MAX_TERM_LENGTH + 1];
        assert!(hash.add(&mut pool, &too_long).unwrap_err().is_invalid_arg());
        assert_eq!(hash.len(), 2);
    }

    #[test]
    fn test_grow_keeps_all_terms() {
        let mut pool = ByteBlockPool::direct();
        let mut hash = BytesRefHash::new();
        for i in 0..10_000u32 {
            let term = format!("term-{i}");
            assert_eq!(hash.add(&mut pool, term.as_bytes()).unwrap(), TermOrd::New(i));
        }
        for i in 0..10_000u32 {
            let term = format!("term-{i}");
            assert_eq!(hash.find(&pool, term.as_bytes()), Some(i));
            assert_eq!(hash.get(&pool, i), term.as_bytes());
        }
        assert_eq!(hash.find(&pool, b"missing"), None);
    }

    #[test]
    fn test_sort_orders_ordinals() {
        let mut pool = ByteBlockPool::direct();
        let mut hash = BytesRefHash::new();
        for term in [&b"cc"[..], b"dd", b"bb", b"aa"] {
            hash.add(&mut pool, term).unwrap();
        }
        assert_eq!(hash.sort(&pool, |a, b| a.cmp(b)), vec![3, 2, 0, 1]);
        assert_eq!(hash.sort(&pool, |a, b| b.cmp(a)), vec![1, 0, 2, 3]);
        // Sorting leaves the hash usable.
        assert_eq!(hash.find(&pool, b"bb"), Some(2));
    }

    #[test]
    fn test_clear() {
        let mut pool = ByteBlockPool::direct();
        let mut hash = BytesRefHash::new();
        hash.add(&mut pool, b"a").unwrap();
        hash.add(&mut pool, b"b").unwrap();
        hash.clear();
        assert!(hash.is_empty());
        assert_eq!(hash.find(&pool, b"a"), None);
        assert_eq!(hash.add(&mut pool, b"b").unwrap(), TermOrd::New(0));
    }
}
