//! Arena-backed collections used by the in-memory index: fixed-size block pools,
//! growable slice chains over int blocks and a byte-sequence hash with dense ordinals.

pub mod allocator;
pub mod byte_block_pool;
pub mod bytes_ref_hash;
pub mod int_block_pool;

pub use allocator::RecyclingAllocator;
pub use byte_block_pool::{BYTE_BLOCK_SIZE, ByteBlockPool};
pub use bytes_ref_hash::{BytesRefHash, MAX_TERM_LENGTH, TermOrd};
pub use int_block_pool::{INT_BLOCK_SIZE, IntBlockPool, SliceReader, SliceWriter};
