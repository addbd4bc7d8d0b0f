//! Transmission buffer pool - the reservation table behind one mutex

use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::{debug, info, warn};

use crate::{
    codeblocks::{CodeblockId, SoftBitArena},
    error::ReserveFailure,
    identifier::{Tick, TrxBufferIdentifier},
};

use super::{
    config::TxBufferPoolConfig,
    handle::{TxBuffer, UniqueTxBuffer},
    stats::{AtomicTxBufferPoolStats, TxBufferPoolStats},
    table::{ReservationTable, SlotState},
};

/// State shared between the pool, its controller and every live handle
#[derive(Debug)]
pub(crate) struct PoolShared {
    config: TxBufferPoolConfig,
    /// Global critical section
    table: Mutex<ReservationTable>,
    /// Signalled when the last locked buffer is released
    all_unlocked: Condvar,
    /// Codeblock content, accessed outside the critical section
    pub(crate) arena: SoftBitArena,
    stats: AtomicTxBufferPoolStats,
}

impl PoolShared {
    fn table(&self) -> MutexGuard<'_, ReservationTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn config(&self) -> &TxBufferPoolConfig {
        &self.config
    }

    /// Called by a handle going out of scope
    pub(crate) fn unlock(&self, slot: usize, codeblocks: Vec<CodeblockId>) {
        let drained = self.table().unlock(slot, codeblocks);
        self.stats.record_release();
        if drained {
            self.all_unlocked.notify_all();
        }
    }
}

/// Concurrency-safe pool of retransmission-persistent transmission buffers.
///
/// Cloning is cheap and every clone operates on the same reservation table,
/// so the pool can be handed to each pipeline thread.
#[derive(Debug, Clone)]
pub struct TxBufferPool {
    shared: Arc<PoolShared>,
}

impl TxBufferPool {
    /// Create a pool from an already validated configuration
    pub(crate) fn new(config: TxBufferPoolConfig) -> Self {
        let arena = if config.external_soft_bits {
            SoftBitArena::external(config.nof_codeblocks)
        } else {
            SoftBitArena::new(config.nof_codeblocks, config.codeblock_bytes())
        };
        let table = ReservationTable::new(
            config.nof_buffers,
            config.nof_codeblocks,
            config.expire_timeout_slots,
        );

        info!(
            "created tx buffer pool: {} buffers, {} codeblocks of {} bits, expire timeout {} slots, {} bytes of soft bits",
            config.nof_buffers,
            config.nof_codeblocks,
            config.max_codeblock_size,
            config.expire_timeout_slots,
            arena.size()
        );

        Self {
            shared: Arc::new(PoolShared {
                config,
                table: Mutex::new(table),
                all_unlocked: Condvar::new(),
                arena,
                stats: AtomicTxBufferPoolStats::new(),
            }),
        }
    }

    /// Reserve and lock the buffer for `id`, reporting why on failure.
    ///
    /// Re-reserving an unlocked identifier returns the same codeblocks with
    /// their content intact, resized to `nof_codeblocks` if needed.
    pub fn try_reserve(
        &self,
        tick: Tick,
        id: TrxBufferIdentifier,
        nof_codeblocks: usize,
    ) -> Result<UniqueTxBuffer, ReserveFailure> {
        let grant = {
            let mut table = self.shared.table();
            match table.reserve(tick, id, nof_codeblocks) {
                Ok(grant) => {
                    self.shared
                        .stats
                        .record_reservation(grant.retransmission, table.locked_count());
                    grant
                }
                Err(failure) => {
                    drop(table);
                    self.shared.stats.record_failure(&failure);
                    match failure {
                        ReserveFailure::NoFreeSlot
                        | ReserveFailure::InsufficientCodeblocks { .. } => {
                            warn!("failed to reserve buffer {} at tick {}: {}", id, tick, failure)
                        }
                        _ => debug!("failed to reserve buffer {} at tick {}: {}", id, tick, failure),
                    }
                    return Err(failure);
                }
            }
        };

        if grant.resized {
            self.shared.stats.record_resize();
        }
        debug!(
            "reserved buffer {} at tick {}: slot {}, {} codeblocks{}",
            id,
            tick,
            grant.slot,
            grant.codeblocks.len(),
            if grant.retransmission { " (retransmission)" } else { "" }
        );

        Ok(UniqueTxBuffer::new(TxBuffer::new(
            Arc::clone(&self.shared),
            id,
            grant.slot,
            grant.codeblocks,
        )))
    }

    /// Reserve and lock the buffer for `id`.
    ///
    /// Any failure yields an invalid handle; check [`UniqueTxBuffer::is_valid`].
    pub fn reserve(
        &self,
        tick: Tick,
        id: TrxBufferIdentifier,
        nof_codeblocks: usize,
    ) -> UniqueTxBuffer {
        self.try_reserve(tick, id, nof_codeblocks)
            .unwrap_or_default()
    }

    /// Housekeeping tick. Must be driven by a single caller in increasing tick order.
    pub fn run_slot(&self, tick: Tick) {
        let evicted = self.shared.table().run_slot(tick);
        for _ in 0..evicted {
            self.shared.stats.record_eviction();
        }
    }

    /// Statistics snapshot
    pub fn stats(&self) -> TxBufferPoolStats {
        let mut stats = self.shared.stats.snapshot();
        let table = self.shared.table();
        stats.occupied_buffers = table.occupied_count();
        stats.locked_buffers = table.locked_count();
        stats.used_codeblocks = table.assigned_codeblocks();
        stats.free_codeblocks = table.free_codeblocks();
        stats
    }

    /// Identifiers currently bound to a slot and whether each one is locked
    pub fn occupied(&self) -> Vec<(TrxBufferIdentifier, bool)> {
        self.shared
            .table()
            .occupied()
            .into_iter()
            .map(|(id, state)| (id, state == SlotState::Locked))
            .collect()
    }

    /// Pool configuration
    pub fn config(&self) -> &TxBufferPoolConfig {
        self.shared.config()
    }

    /// Whether the pool refuses reservations
    pub fn is_stopped(&self) -> bool {
        self.shared.table().is_stopped()
    }

    /// Close the pool and wait for every locked buffer to be released.
    ///
    /// With a timeout, returns false if buffers were still locked when it elapsed.
    pub(crate) fn close_and_drain(&self, timeout: Option<Duration>) -> bool {
        let mut table = self.shared.table();
        if !table.is_stopped() {
            table.stop();
            info!(
                "stopping tx buffer pool, waiting for {} locked buffers",
                table.locked_count()
            );
        }

        let table = match timeout {
            None => self
                .shared
                .all_unlocked
                .wait_while(table, |table| table.locked_count() > 0)
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                self.shared
                    .all_unlocked
                    .wait_timeout_while(table, timeout, |table| table.locked_count() > 0)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };

        let remaining = table.locked_count();
        if remaining > 0 {
            warn!("tx buffer pool stop timed out with {} locked buffers", remaining);
        }
        remaining == 0
    }
}
