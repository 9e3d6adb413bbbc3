//! Arena of fixed-size `i32` blocks holding chains of growing slices.
//!
//! A slice chain is an append-only list of ints. It starts as a tiny slice and, each
//! time the current slice fills up, continues in a larger one allocated further along
//! the pool. The last slot of every slice holds a non-zero level marker. When a
//! writer reaches that marker, the slot is overwritten with the global offset of the
//! next slice, so the chain can be walked forward by a reader that knows the start and
//! end offsets. Unwritten slots must be zero, which is why the pool zero-fills blocks
//! before recycling them.

use quarry_common::Result;

use crate::allocator::RecyclingAllocator;

pub const INT_BLOCK_SHIFT: usize = 13;
pub const INT_BLOCK_SIZE: usize = 1 << INT_BLOCK_SHIFT;
pub const INT_BLOCK_MASK: usize = INT_BLOCK_SIZE - 1;

/// Slice size for each level.
const LEVEL_SIZES: [usize; 10] = [2, 4, 8, 16, 32, 64, 128, 256, 512, 1024];
/// Level that follows each level; the last level repeats.
const NEXT_LEVEL: [usize; 10] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 9];
const FIRST_LEVEL_SIZE: usize = LEVEL_SIZES[0];
/// Keeps the level marker non-zero even for level 0.
const LEVEL_MARKER: i32 = 16;

pub struct IntBlockPool {
    buffers: Vec<Box<[i32]>>,
    /// Write position inside the head block.
    int_upto: usize,
    allocator: RecyclingAllocator<i32>,
}

impl IntBlockPool {
    pub fn new(allocator: RecyclingAllocator<i32>) -> IntBlockPool {
        debug_assert_eq!(allocator.block_size(), INT_BLOCK_SIZE);
        IntBlockPool {
            buffers: Vec::new(),
            int_upto: INT_BLOCK_SIZE,
            allocator,
        }
    }

    pub fn direct() -> IntBlockPool {
        Self::new(RecyclingAllocator::direct(INT_BLOCK_SIZE))
    }

    pub fn num_blocks(&self) -> usize {
        self.buffers.len()
    }

    pub fn bytes_used(&self) -> usize {
        self.allocator.bytes_used()
    }

    /// Global offset of the head block's first int.
    fn int_offset(&self) -> usize {
        self.buffers.len().saturating_sub(1) * INT_BLOCK_SIZE
    }

    #[inline]
    fn get(&self, offset: usize) -> i32 {
        self.buffers[offset >> INT_BLOCK_SHIFT][offset & INT_BLOCK_MASK]
    }

    #[inline]
    fn set(&mut self, offset: usize, value: i32) {
        self.buffers[offset >> INT_BLOCK_SHIFT][offset & INT_BLOCK_MASK] = value;
    }

    fn next_buffer(&mut self) -> Result<()> {
        let block = self.allocator.get_block()?;
        debug_assert!(block.iter().all(|&v| v == 0), "slice blocks must be zeroed");
        self.buffers.push(block);
        self.int_upto = 0;
        Ok(())
    }

    /// Carves a new slice of `size` ints and returns its global start offset.
    fn new_slice(&mut self, size: usize) -> Result<usize> {
        if self.int_upto > INT_BLOCK_SIZE - size {
            self.next_buffer()?;
        }
        let start = self.int_offset() + self.int_upto;
        self.int_upto += size;
        self.set(start + size - 1, LEVEL_MARKER);
        Ok(start)
    }

    /// Allocates the slice that continues the one whose marker sits at `marker_offset`,
    /// links it in place of the marker, and returns the new slice's start offset.
    fn alloc_slice(&mut self, marker_offset: usize) -> Result<usize> {
        let level = (self.get(marker_offset) & 15) as usize;
        let new_level = NEXT_LEVEL[level];
        let new_size = LEVEL_SIZES[new_level];
        if self.int_upto > INT_BLOCK_SIZE - new_size {
            self.next_buffer()?;
        }
        let start = self.int_offset() + self.int_upto;
        self.int_upto += new_size;
        self.set(marker_offset, start as i32);
        self.set(start + new_size - 1, LEVEL_MARKER | new_level as i32);
        Ok(start)
    }

    /// Returns all blocks to the allocator.
    ///
    /// Slice chains rely on unwritten slots being zero, so callers that intend to
    /// reuse recycled blocks for slices must pass `zero_fill = true`.
    pub fn reset(&mut self, zero_fill: bool, reuse_first: bool) {
        if self.buffers.is_empty() {
            return;
        }
        if zero_fill {
            let last = self.buffers.len() - 1;
            for (i, block) in self.buffers.iter_mut().enumerate() {
                let used = if i == last { self.int_upto } else { block.len() };
                block[..used].fill(0);
            }
        }
        let keep = usize::from(reuse_first);
        let recycled = self.buffers.drain(keep..).collect::<Vec<_>>();
        self.allocator.recycle_blocks(recycled);
        self.int_upto = if reuse_first { 0 } else { INT_BLOCK_SIZE };
    }
}

/// Appends ints to slice chains inside an [`IntBlockPool`].
pub struct SliceWriter<'a> {
    pool: &'a mut IntBlockPool,
    offset: usize,
}

impl<'a> SliceWriter<'a> {
    pub fn new(pool: &'a mut IntBlockPool) -> SliceWriter<'a> {
        SliceWriter { pool, offset: 0 }
    }

    /// Positions the writer at the end of an existing chain.
    pub fn reset(&mut self, end_offset: u32) {
        self.offset = end_offset as usize;
    }

    /// Starts a new chain and returns its start offset.
    pub fn start_new_slice(&mut self) -> Result<u32> {
        self.offset = self.pool.new_slice(FIRST_LEVEL_SIZE)?;
        Ok(self.offset as u32)
    }

    /// Appends a value, continuing into a larger slice when the current one is full.
    pub fn write_int(&mut self, value: i32) -> Result<()> {
        if self.pool.get(self.offset) != 0 {
            self.offset = self.pool.alloc_slice(self.offset)?;
        }
        self.pool.set(self.offset, value);
        self.offset += 1;
        Ok(())
    }

    /// Offset one past the last value written; the chain's end pointer.
    pub fn current_offset(&self) -> u32 {
        self.offset as u32
    }
}

/// Reads back a slice chain between a start and an end offset.
pub struct SliceReader<'a> {
    pool: &'a IntBlockPool,
    buffer_index: usize,
    buffer_offset: usize,
    upto: usize,
    limit: usize,
    level: usize,
    end: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(pool: &'a IntBlockPool) -> SliceReader<'a> {
        SliceReader {
            pool,
            buffer_index: 0,
            buffer_offset: 0,
            upto: 0,
            limit: 0,
            level: 0,
            end: 0,
        }
    }

    pub fn reset(&mut self, start_offset: u32, end_offset: u32) {
        let start = start_offset as usize;
        let end = end_offset as usize;
        debug_assert!(start <= end);
        self.buffer_index = start >> INT_BLOCK_SHIFT;
        self.buffer_offset = self.buffer_index * INT_BLOCK_SIZE;
        self.end = end;
        self.level = 0;
        self.upto = start & INT_BLOCK_MASK;
        self.limit = if start + FIRST_LEVEL_SIZE >= end {
            // The whole chain lives in its first slice.
            end - self.buffer_offset
        } else {
            self.upto + FIRST_LEVEL_SIZE - 1
        };
    }

    pub fn end_of_slice(&self) -> bool {
        debug_assert!(self.upto + self.buffer_offset <= self.end);
        self.upto + self.buffer_offset == self.end
    }

    /// Reads the next value. Callers must check [`end_of_slice`](Self::end_of_slice) first.
    pub fn read_int(&mut self) -> i32 {
        debug_assert!(!self.end_of_slice(), "read past the end of a slice chain");
        debug_assert!(self.upto <= self.limit);
        if self.upto == self.limit {
            self.next_slice();
        }
        let value = self.pool.buffers[self.buffer_index][self.upto];
        self.upto += 1;
        value
    }

    fn next_slice(&mut self) {
        let next = self.pool.buffers[self.buffer_index][self.limit] as usize;
        self.level = NEXT_LEVEL[self.level];
        let size = LEVEL_SIZES[self.level];
        self.buffer_index = next >> INT_BLOCK_SHIFT;
        self.buffer_offset = self.buffer_index * INT_BLOCK_SIZE;
        self.upto = next & INT_BLOCK_MASK;
        self.limit = if next + size >= self.end {
            self.end - self.buffer_offset
        } else {
            self.upto + size - 1
        };
    }
}
