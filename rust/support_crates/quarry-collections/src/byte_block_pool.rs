//! Arena of fixed-size byte blocks addressed by a single global offset.

use quarry_common::{Result, verify_arg};

use crate::allocator::RecyclingAllocator;

pub const BYTE_BLOCK_SHIFT: usize = 15;
pub const BYTE_BLOCK_SIZE: usize = 1 << BYTE_BLOCK_SHIFT;
pub const BYTE_BLOCK_MASK: usize = BYTE_BLOCK_SIZE - 1;

/// Append-only byte arena.
///
/// Bytes are written into the current head block; a new block is pulled from the
/// allocator when a contiguous region does not fit into what is left of the head.
/// A global offset `block_index * BYTE_BLOCK_SIZE + offset_in_block` identifies any
/// byte ever written, until the pool is reset.
pub struct ByteBlockPool {
    buffers: Vec<Box<[u8]>>,
    /// Write position inside the head block.
    byte_upto: usize,
    allocator: RecyclingAllocator<u8>,
}

impl ByteBlockPool {
    pub fn new(allocator: RecyclingAllocator<u8>) -> ByteBlockPool {
        debug_assert_eq!(allocator.block_size(), BYTE_BLOCK_SIZE);
        ByteBlockPool {
            buffers: Vec::new(),
            byte_upto: BYTE_BLOCK_SIZE,
            allocator,
        }
    }

    /// Creates a pool whose allocator does not retain blocks across resets.
    pub fn direct() -> ByteBlockPool {
        Self::new(RecyclingAllocator::direct(BYTE_BLOCK_SIZE))
    }

    /// Number of blocks currently owned by the pool.
    pub fn num_blocks(&self) -> usize {
        self.buffers.len()
    }

    /// Global offset of the head block's first byte.
    fn byte_offset(&self) -> usize {
        self.buffers.len().saturating_sub(1) * BYTE_BLOCK_SIZE
    }

    /// Bytes held by all live blocks, including recycled ones parked in the allocator.
    pub fn bytes_used(&self) -> usize {
        self.allocator.bytes_used()
    }

    fn next_buffer(&mut self) -> Result<()> {
        let block = self.allocator.get_block()?;
        self.buffers.push(block);
        self.byte_upto = 0;
        Ok(())
    }

    /// Reserves `len` contiguous bytes that do not straddle a block boundary and
    /// returns their global offset.
    pub fn allocate(&mut self, len: usize) -> Result<usize> {
        verify_arg!(len, len <= BYTE_BLOCK_SIZE);
        if self.byte_upto + len > BYTE_BLOCK_SIZE {
            self.next_buffer()?;
        }
        let offset = self.byte_offset() + self.byte_upto;
        self.byte_upto += len;
        Ok(offset)
    }

    /// Returns a region previously obtained from [`allocate`](Self::allocate).
    ///
    /// # Panics
    ///
    /// Panics if the region was never allocated.
    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        let block = &self.buffers[offset >> BYTE_BLOCK_SHIFT];
        let start = offset & BYTE_BLOCK_MASK;
        &block[start..start + len]
    }

    /// Mutable counterpart of [`slice`](Self::slice).
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        let block = &mut self.buffers[offset >> BYTE_BLOCK_SHIFT];
        let start = offset & BYTE_BLOCK_MASK;
        &mut block[start..start + len]
    }

    /// Reads the byte at a global offset.
    #[inline]
    pub fn byte_at(&self, offset: usize) -> u8 {
        self.buffers[offset >> BYTE_BLOCK_SHIFT][offset & BYTE_BLOCK_MASK]
    }

    /// Returns every block to the allocator.
    ///
    /// * `zero_fill` - clear the used part of each block before handing it back.
    /// * `reuse_first` - keep the first block as the new head instead of recycling it.
    pub fn reset(&mut self, zero_fill: bool, reuse_first: bool) {
        if self.buffers.is_empty() {
            return;
        }
        if zero_fill {
            let last = self.buffers.len() - 1;
            for (i, block) in self.buffers.iter_mut().enumerate() {
                let used = if i == last { self.byte_upto } else { block.len() };
                block[..used].fill(0);
            }
        }
        let keep = usize::from(reuse_first);
        let recycled = self.buffers.drain(keep..).collect::<Vec<_>>();
        self.allocator.recycle_blocks(recycled);
        self.byte_upto = if reuse_first { 0 } else { BYTE_BLOCK_SIZE };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_does_not_straddle_blocks() {
        let mut pool = ByteBlockPool::direct();
        let a = pool.allocate(BYTE_BLOCK_SIZE - 10).unwrap();
        assert_eq!(a, 0);
        let b = pool.allocate(20).unwrap();
        assert_eq!(b, BYTE_BLOCK_SIZE);
        assert_eq!(pool.num_blocks(), 2);

        pool.slice_mut(b, 20).copy_from_slice(&[7u8; 20]);
        assert_eq!(pool.slice(b, 20), &[7u8; 20]);
        assert_eq!(pool.byte_at(b + 19), 7);
    }

    #[test]
    fn test_allocate_rejects_oversized_region() {
        let mut pool = ByteBlockPool::direct();
        assert!(pool.allocate(BYTE_BLOCK_SIZE + 1).is_err());
        assert_eq!(pool.num_blocks(), 0);
    }

    #[test]
    fn test_reset_reuse_first_and_zero_fill() {
        let mut pool = ByteBlockPool::new(RecyclingAllocator::new(BYTE_BLOCK_SIZE, 4));
        let off = pool.allocate(4).unwrap();
        pool.slice_mut(off, 4).copy_from_slice(b"abcd");
        pool.allocate(BYTE_BLOCK_SIZE).unwrap();
        assert_eq!(pool.num_blocks(), 2);

        pool.reset(true, true);
        assert_eq!(pool.num_blocks(), 1);
        assert_eq!(pool.slice(0, 4), &[0u8; 4]);
        assert_eq!(pool.allocate(1).unwrap(), 0);
        assert_eq!(pool.bytes_used(), 2 * BYTE_BLOCK_SIZE);
    }

    #[test]
    fn test_reset_without_reuse_recycles_everything() {
        let mut pool = ByteBlockPool::new(RecyclingAllocator::new(BYTE_BLOCK_SIZE, 1));
        pool.allocate(BYTE_BLOCK_SIZE).unwrap();
        pool.allocate(BYTE_BLOCK_SIZE).unwrap();
        pool.reset(false, false);
        assert_eq!(pool.num_blocks(), 0);
        // One block stays parked in the allocator.
        assert_eq!(pool.bytes_used(), BYTE_BLOCK_SIZE);
        assert_eq!(pool.allocate(3).unwrap(), 0);
    }
}
