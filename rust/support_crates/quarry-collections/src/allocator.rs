//! Fixed-size block allocator shared by the byte and int block pools.

use quarry_common::{Result, error::Error};

/// Hands out fixed-size, zero-initialized blocks and optionally keeps a bounded
/// number of returned blocks around for reuse.
///
/// The allocator tracks `bytes_used`: the size of every block it has produced that
/// is still alive, whether currently handed out or parked in the free list.
/// It carries no synchronization; each pool owns its own allocator.
pub struct RecyclingAllocator<T> {
    block_size: usize,
    max_buffered_blocks: usize,
    free_blocks: Vec<Box<[T]>>,
    bytes_used: usize,
}

impl<T: Copy + Default> RecyclingAllocator<T> {
    /// Creates an allocator that keeps at most `max_buffered_blocks` recycled blocks.
    pub fn new(block_size: usize, max_buffered_blocks: usize) -> Self {
        RecyclingAllocator {
            block_size,
            max_buffered_blocks,
            free_blocks: Vec::new(),
            bytes_used: 0,
        }
    }

    /// Creates an allocator that never retains recycled blocks.
    pub fn direct(block_size: usize) -> Self {
        Self::new(block_size, 0)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of recycled blocks currently parked in the free list.
    pub fn num_buffered_blocks(&self) -> usize {
        self.free_blocks.len()
    }

    pub fn max_buffered_blocks(&self) -> usize {
        self.max_buffered_blocks
    }

    /// Bytes held by every live block produced by this allocator.
    pub fn bytes_used(&self) -> usize {
        self.bytes_used
    }

    /// Returns a block, preferring the free list over a fresh allocation.
    ///
    /// Fresh blocks are zero-filled. Recycled blocks hold whatever the pool left in
    /// them when they were returned; pools that depend on zeroed memory must zero-fill
    /// before recycling.
    pub fn get_block(&mut self) -> Result<Box<[T]>> {
        if let Some(block) = self.free_blocks.pop() {
            return Ok(block);
        }
        let bytes = self.block_size * std::mem::size_of::<T>();
        let mut block = Vec::new();
        block
            .try_reserve_exact(self.block_size)
            .map_err(|_| Error::out_of_memory(bytes))?;
        block.resize(self.block_size, T::default());
        self.bytes_used += bytes;
        Ok(block.into_boxed_slice())
    }

    /// Takes back blocks from a pool. Blocks beyond the retention limit are freed.
    pub fn recycle_blocks<I>(&mut self, blocks: I)
    where
        I: IntoIterator<Item = Box<[T]>>,
    {
        let block_bytes = self.block_size * std::mem::size_of::<T>();
        let mut freed = 0usize;
        for block in blocks {
            debug_assert_eq!(block.len(), self.block_size);
            if self.free_blocks.len() < self.max_buffered_blocks {
                self.free_blocks.push(block);
            } else {
                freed += 1;
            }
        }
        if freed > 0 {
            self.bytes_used -= freed * block_bytes;
            log::trace!("allocator released {freed} blocks of {block_bytes} bytes");
        }
    }

    /// Drops up to `num` parked blocks, returning how many were released.
    pub fn free_blocks(&mut self, num: usize) -> usize {
        let keep = self.free_blocks.len().saturating_sub(num);
        let released = self.free_blocks.len() - keep;
        self.free_blocks.truncate(keep);
        self.bytes_used -= released * self.block_size * std::mem::size_of::<T>();
        released
    }
}
