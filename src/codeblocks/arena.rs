//! Pre-sized storage backing every codeblock of a pool

use std::{cell::UnsafeCell, slice};

use super::store::CodeblockId;

/// Contiguous arena holding the bit content of every codeblock.
///
/// The arena is allocated once at pool construction. Exclusive access to a
/// codeblock is guaranteed by the reservation table, not by the arena, which
/// is why the accessors are `unsafe`.
pub struct SoftBitArena {
    /// Codeblock bytes, `block_bytes` per codeblock
    storage: Box<[UnsafeCell<u8>]>,
    /// Bytes reserved per codeblock
    block_bytes: usize,
    /// Number of codeblocks covered by the arena
    nof_blocks: usize,
    /// Content lives outside the pool
    external: bool,
}

impl SoftBitArena {
    /// Allocate a zeroed arena for `nof_blocks` codeblocks of `block_bytes` each
    pub fn new(nof_blocks: usize, block_bytes: usize) -> Self {
        let storage = (0..nof_blocks * block_bytes)
            .map(|_| UnsafeCell::new(0u8))
            .collect();
        Self {
            storage,
            block_bytes,
            nof_blocks,
            external: false,
        }
    }

    /// Arena for pools whose codeblock content is owned by the caller
    pub fn external(nof_blocks: usize) -> Self {
        Self {
            storage: Box::new([]),
            block_bytes: 0,
            nof_blocks,
            external: true,
        }
    }

    /// Whether codeblock content is stored outside the pool
    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Bytes per codeblock
    pub fn block_bytes(&self) -> usize {
        self.block_bytes
    }

    /// Total bytes held by the arena
    pub fn size(&self) -> usize {
        self.storage.len()
    }

    fn block_ptr(&self, block: CodeblockId) -> *mut u8 {
        let block = block as usize;
        assert!(
            !self.external,
            "codeblock storage is external to the buffer pool"
        );
        assert!(
            block < self.nof_blocks,
            "codeblock {} out of range (arena holds {})",
            block,
            self.nof_blocks
        );

        let base = UnsafeCell::raw_get(self.storage.as_ptr());
        // SAFETY: block < nof_blocks keeps the offset inside the allocation.
        unsafe { base.add(block * self.block_bytes) }
    }

    /// Read access to one codeblock
    ///
    /// # Safety
    /// No mutable reference to the same codeblock may be alive.
    pub unsafe fn block(&self, block: CodeblockId) -> &[u8] {
        slice::from_raw_parts(self.block_ptr(block), self.block_bytes)
    }

    /// Write access to one codeblock
    ///
    /// # Safety
    /// The caller must hold exclusive access to `block` for the lifetime of
    /// the returned slice.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn block_mut(&self, block: CodeblockId) -> &mut [u8] {
        slice::from_raw_parts_mut(self.block_ptr(block), self.block_bytes)
    }
}

impl std::fmt::Debug for SoftBitArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftBitArena")
            .field("nof_blocks", &self.nof_blocks)
            .field("block_bytes", &self.block_bytes)
            .field("external", &self.external)
            .finish()
    }
}

// SAFETY: concurrent access is restricted to disjoint codeblocks, each one
// owned by a single locked buffer.
unsafe impl Sync for SoftBitArena {}
