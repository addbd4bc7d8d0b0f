//! Exclusive buffer handles
//!
//! A [`UniqueTxBuffer`] is the only way to reach a buffer's codeblocks. It
//! owns the lock on one reservation slot and gives it back when dropped or
//! overwritten, from whichever thread it ends up on.

use std::{fmt, sync::Arc};

use log::trace;

use crate::{
    codeblocks::{BitBuffer, CodeblockId},
    identifier::TrxBufferIdentifier,
};

use super::buffer_pool::PoolShared;

/// A locked transmission buffer
pub struct TxBuffer {
    pool: Arc<PoolShared>,
    id: TrxBufferIdentifier,
    slot: usize,
    codeblocks: Vec<CodeblockId>,
}

impl TxBuffer {
    pub(crate) fn new(
        pool: Arc<PoolShared>,
        id: TrxBufferIdentifier,
        slot: usize,
        codeblocks: Vec<CodeblockId>,
    ) -> Self {
        Self {
            pool,
            id,
            slot,
            codeblocks,
        }
    }

    /// Identifier the buffer is bound to
    pub fn identifier(&self) -> TrxBufferIdentifier {
        self.id
    }

    /// Number of codeblocks assigned to the buffer
    pub fn nof_codeblocks(&self) -> usize {
        self.codeblocks.len()
    }

    /// Index of codeblock `cb` inside the pool's codeblock store
    pub fn absolute_codeblock_id(&self, cb: usize) -> CodeblockId {
        assert!(
            cb < self.codeblocks.len(),
            "codeblock {} out of range, buffer {} holds {}",
            cb,
            self.id,
            self.codeblocks.len()
        );
        self.codeblocks[cb]
    }

    /// Read view over the first `nof_bits` bits of codeblock `cb`
    pub fn codeblock(&self, cb: usize, nof_bits: usize) -> BitBuffer<&[u8]> {
        self.check_bits(nof_bits);
        BitBuffer::new(self.codeblock_bytes(cb), nof_bits)
    }

    /// Write view over the first `nof_bits` bits of codeblock `cb`
    pub fn codeblock_mut(&mut self, cb: usize, nof_bits: usize) -> BitBuffer<&mut [u8]> {
        self.check_bits(nof_bits);
        let block = self.absolute_codeblock_id(cb);
        // SAFETY: the codeblock belongs to this locked buffer only and the
        // view borrows the buffer mutably.
        let bytes = unsafe { self.pool.arena.block_mut(block) };
        BitBuffer::new(bytes, nof_bits)
    }

    /// Raw packed bytes of codeblock `cb`
    pub fn codeblock_bytes(&self, cb: usize) -> &[u8] {
        let block = self.absolute_codeblock_id(cb);
        // SAFETY: no mutable view can coexist with this shared borrow.
        unsafe { self.pool.arena.block(block) }
    }

    fn check_bits(&self, nof_bits: usize) {
        let max = self.pool.config().max_codeblock_size;
        assert!(
            nof_bits <= max,
            "codeblock view of {} bits exceeds the maximum codeblock size of {} bits",
            nof_bits,
            max
        );
    }
}

impl Drop for TxBuffer {
    fn drop(&mut self) {
        trace!("unlocking buffer {} (slot {})", self.id, self.slot);
        self.pool
            .unlock(self.slot, std::mem::take(&mut self.codeblocks));
    }
}

impl fmt::Debug for TxBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxBuffer")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .field("codeblocks", &self.codeblocks)
            .finish()
    }
}

/// Move-only handle holding the lock on one buffer, or nothing.
///
/// Assigning a new value releases the previously held buffer first, so
/// `handle = UniqueTxBuffer::default()` is an unlock.
#[derive(Debug, Default)]
pub struct UniqueTxBuffer {
    buffer: Option<TxBuffer>,
}

impl UniqueTxBuffer {
    pub(crate) fn new(buffer: TxBuffer) -> Self {
        Self {
            buffer: Some(buffer),
        }
    }

    /// Whether the handle holds a buffer
    pub fn is_valid(&self) -> bool {
        self.buffer.is_some()
    }

    /// The held buffer.
    ///
    /// # Panics
    /// If the handle is invalid.
    pub fn get(&self) -> &TxBuffer {
        match &self.buffer {
            Some(buffer) => buffer,
            None => panic!("access through an invalid transmission buffer handle"),
        }
    }

    /// The held buffer, mutably.
    ///
    /// # Panics
    /// If the handle is invalid.
    pub fn get_mut(&mut self) -> &mut TxBuffer {
        match &mut self.buffer {
            Some(buffer) => buffer,
            None => panic!("access through an invalid transmission buffer handle"),
        }
    }

    /// The held buffer, if any
    pub fn buffer(&self) -> Option<&TxBuffer> {
        self.buffer.as_ref()
    }

    /// Unlock the held buffer now, leaving the handle invalid
    pub fn release(&mut self) {
        self.buffer = None;
    }
}
