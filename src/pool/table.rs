//! Reservation table - identifier to slot binding, locking and eviction
//!
//! The table is a plain state machine. [`TxBufferPool`](super::TxBufferPool)
//! wraps it in a single mutex, so every method here runs inside the global
//! critical section and never observes a torn state.
//!
//! Slot lifecycle:
//!
//! ```text
//! Free --reserve--> Locked --unlock--> Unlocked --reserve--> Locked
//!                                         |
//!                                         +--run_slot (idle >= timeout)--> Free
//! ```

use std::collections::HashMap;

use log::debug;

use crate::{
    codeblocks::{CodeblockId, CodeblockStore},
    error::ReserveFailure,
    identifier::{Tick, TrxBufferIdentifier},
};

/// Occupancy and lock state of a reservation slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No identifier bound
    Free,
    /// Identifier bound, content preserved, no handle outstanding
    Unlocked,
    /// Identifier bound and held by exactly one handle
    Locked,
}

#[derive(Debug)]
struct ReservationSlot {
    id: Option<TrxBufferIdentifier>,
    state: SlotState,
    /// Codeblock assignment. Moved into the handle while the slot is locked.
    codeblocks: Vec<CodeblockId>,
    nof_codeblocks: usize,
    last_access: Tick,
}

impl ReservationSlot {
    fn new() -> Self {
        Self {
            id: None,
            state: SlotState::Free,
            codeblocks: Vec::new(),
            nof_codeblocks: 0,
            last_access: 0,
        }
    }
}

/// Result of a successful reservation
#[derive(Debug)]
pub struct Grant {
    /// Slot index now locked for the caller
    pub slot: usize,
    /// Codeblock assignment, owned by the handle until it is released
    pub codeblocks: Vec<CodeblockId>,
    /// The identifier was already occupied (content preserved)
    pub retransmission: bool,
    /// The codeblock assignment changed size
    pub resized: bool,
}

/// Fixed set of reservation slots sharing one codeblock store
#[derive(Debug)]
pub struct ReservationTable {
    slots: Vec<ReservationSlot>,
    index: HashMap<TrxBufferIdentifier, usize>,
    store: CodeblockStore,
    expire_timeout: Tick,
    /// Latest housekeeping tick
    current_tick: Tick,
    locked: usize,
    stopped: bool,
}

impl ReservationTable {
    /// Create a table with `nof_buffers` slots over `nof_codeblocks` codeblocks
    pub fn new(nof_buffers: usize, nof_codeblocks: usize, expire_timeout: Tick) -> Self {
        Self {
            slots: (0..nof_buffers).map(|_| ReservationSlot::new()).collect(),
            index: HashMap::with_capacity(nof_buffers),
            store: CodeblockStore::new(nof_codeblocks),
            expire_timeout,
            current_tick: 0,
            locked: 0,
            stopped: false,
        }
    }

    /// Lock the buffer for `id`, binding a free slot if the identifier is new.
    ///
    /// A failure leaves the table untouched.
    pub fn reserve(
        &mut self,
        tick: Tick,
        id: TrxBufferIdentifier,
        nof_codeblocks: usize,
    ) -> Result<Grant, ReserveFailure> {
        if self.stopped {
            return Err(ReserveFailure::PoolStopped);
        }

        if let Some(&index) = self.index.get(&id) {
            let slot = &mut self.slots[index];
            if slot.state == SlotState::Locked {
                return Err(ReserveFailure::IdentifierLocked);
            }

            let resized = slot.codeblocks.len() != nof_codeblocks;
            if resized {
                self.store.resize(&mut slot.codeblocks, nof_codeblocks)?;
            }
            return Ok(self.lock(index, tick, true, resized));
        }

        let index = self
            .slots
            .iter()
            .position(|slot| slot.state == SlotState::Free)
            .ok_or(ReserveFailure::NoFreeSlot)?;

        let slot = &mut self.slots[index];
        self.store.acquire(nof_codeblocks, &mut slot.codeblocks)?;
        slot.id = Some(id);
        self.index.insert(id, index);

        Ok(self.lock(index, tick, false, false))
    }

    fn lock(&mut self, index: usize, tick: Tick, retransmission: bool, resized: bool) -> Grant {
        let slot = &mut self.slots[index];
        slot.state = SlotState::Locked;
        slot.last_access = tick;
        slot.nof_codeblocks = slot.codeblocks.len();
        self.locked += 1;

        Grant {
            slot: index,
            codeblocks: std::mem::take(&mut slot.codeblocks),
            retransmission,
            resized,
        }
    }

    /// Return a locked slot to the unlocked state, handing back its codeblocks.
    ///
    /// The grace period starts at the later of the last housekeeping tick and
    /// the slot's own reservation tick. Returns true when no slot remains locked.
    pub fn unlock(&mut self, index: usize, codeblocks: Vec<CodeblockId>) -> bool {
        let slot = &mut self.slots[index];
        debug_assert_eq!(slot.state, SlotState::Locked, "unlocking a slot that is not locked");
        debug_assert_eq!(slot.nof_codeblocks, codeblocks.len());

        slot.codeblocks = codeblocks;
        slot.state = SlotState::Unlocked;
        slot.last_access = slot.last_access.max(self.current_tick);
        self.locked -= 1;

        self.locked == 0
    }

    /// Housekeeping tick: renew locked slots and evict idle ones.
    ///
    /// Returns the number of evicted slots.
    pub fn run_slot(&mut self, tick: Tick) -> usize {
        self.current_tick = self.current_tick.max(tick);

        let mut evicted = 0;
        for slot in self.slots.iter_mut() {
            match slot.state {
                SlotState::Free => {}
                SlotState::Locked => slot.last_access = tick,
                SlotState::Unlocked => {
                    if tick.saturating_sub(slot.last_access) < self.expire_timeout {
                        continue;
                    }

                    self.store.release(&mut slot.codeblocks);
                    if let Some(id) = slot.id.take() {
                        self.index.remove(&id);
                        debug!(
                            "evicted buffer {} at tick {} (idle since {})",
                            id, tick, slot.last_access
                        );
                    }
                    slot.state = SlotState::Free;
                    slot.nof_codeblocks = 0;
                    evicted += 1;
                }
            }
        }

        evicted
    }

    /// Refuse every later reservation
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Whether reservations are refused
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Number of slots held by a handle
    pub fn locked_count(&self) -> usize {
        self.locked
    }

    /// Number of slots bound to an identifier
    pub fn occupied_count(&self) -> usize {
        self.index.len()
    }

    /// Codeblocks not assigned to any slot
    pub fn free_codeblocks(&self) -> usize {
        self.store.free_count()
    }

    /// Codeblocks assigned to occupied slots, including those held by handles
    pub fn assigned_codeblocks(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.state != SlotState::Free)
            .map(|slot| slot.nof_codeblocks)
            .sum()
    }

    /// Identifiers currently bound, with their state
    pub fn occupied(&self) -> Vec<(TrxBufferIdentifier, SlotState)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.id.map(|id| (id, slot.state)))
            .collect()
    }

    /// State of the slot bound to `id`, if any
    pub fn state_of(&self, id: &TrxBufferIdentifier) -> Option<SlotState> {
        self.index.get(id).map(|&index| self.slots[index].state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(harq: u8) -> TrxBufferIdentifier {
        TrxBufferIdentifier::new(0x4601, harq)
    }

    #[test]
    fn test_reserve_binds_and_locks() {
        let mut table = ReservationTable::new(2, 4, 10);
        let grant = table.reserve(0, id(0), 3).unwrap();

        assert_eq!(grant.slot, 0);
        assert_eq!(grant.codeblocks, vec![0, 1, 2]);
        assert!(!grant.retransmission);
        assert_eq!(table.state_of(&id(0)), Some(SlotState::Locked));
        assert_eq!(table.locked_count(), 1);
        assert_eq!(table.free_codeblocks(), 1);
    }

    #[test]
    fn test_locked_identifier_is_refused() {
        let mut table = ReservationTable::new(2, 4, 10);
        let _grant = table.reserve(0, id(0), 1).unwrap();

        assert_eq!(
            table.reserve(0, id(0), 1).unwrap_err(),
            ReserveFailure::IdentifierLocked
        );
        assert_eq!(table.occupied_count(), 1);
    }

    #[test]
    fn test_unlock_preserves_assignment() {
        let mut table = ReservationTable::new(1, 4, 10);
        let grant = table.reserve(0, id(0), 2).unwrap();
        assert!(table.unlock(grant.slot, grant.codeblocks));
        assert_eq!(table.state_of(&id(0)), Some(SlotState::Unlocked));

        let again = table.reserve(1, id(0), 2).unwrap();
        assert!(again.retransmission);
        assert!(!again.resized);
        assert_eq!(again.codeblocks, vec![0, 1]);
    }

    #[test]
    fn test_codeblock_shortage_leaves_slot_free() {
        let mut table = ReservationTable::new(2, 2, 10);
        let _grant = table.reserve(0, id(0), 2).unwrap();

        let err = table.reserve(0, id(1), 1).unwrap_err();
        assert_eq!(
            err,
            ReserveFailure::InsufficientCodeblocks {
                requested: 1,
                available: 0
            }
        );
        assert_eq!(table.state_of(&id(1)), None);
        assert_eq!(table.occupied_count(), 1);
    }

    #[test]
    fn test_no_free_slot() {
        let mut table = ReservationTable::new(1, 4, 10);
        let _grant = table.reserve(0, id(0), 1).unwrap();
        assert_eq!(
            table.reserve(0, id(1), 1).unwrap_err(),
            ReserveFailure::NoFreeSlot
        );
    }

    #[test]
    fn test_resize_failure_keeps_assignment() {
        let mut table = ReservationTable::new(2, 3, 10);
        let grant = table.reserve(0, id(0), 2).unwrap();
        table.unlock(grant.slot, grant.codeblocks);

        assert!(matches!(
            table.reserve(0, id(0), 4),
            Err(ReserveFailure::InsufficientCodeblocks { .. })
        ));
        assert_eq!(table.free_codeblocks(), 1);
        assert_eq!(table.state_of(&id(0)), Some(SlotState::Unlocked));

        let grant = table.reserve(0, id(0), 1).unwrap();
        assert!(grant.resized);
        assert_eq!(grant.codeblocks, vec![0]);
        assert_eq!(table.free_codeblocks(), 2);
    }

    #[test]
    fn test_eviction_after_timeout() {
        let mut table = ReservationTable::new(1, 1, 4);
        let grant = table.reserve(2, id(0), 1).unwrap();
        table.unlock(grant.slot, grant.codeblocks);

        for tick in 3..6 {
            assert_eq!(table.run_slot(tick), 0);
        }
        assert_eq!(table.run_slot(6), 1);
        assert_eq!(table.occupied_count(), 0);
        assert_eq!(table.free_codeblocks(), 1);
        assert!(table.reserve(6, id(1), 1).is_ok());
    }

    #[test]
    fn test_locked_slot_is_renewed() {
        let mut table = ReservationTable::new(1, 1, 2);
        let grant = table.reserve(0, id(0), 1).unwrap();

        for tick in 1..20 {
            assert_eq!(table.run_slot(tick), 0);
        }
        table.unlock(grant.slot, grant.codeblocks);

        assert_eq!(table.run_slot(20), 0);
        assert_eq!(table.run_slot(21), 1);
    }

    #[test]
    fn test_zero_timeout_evicts_on_next_tick() {
        let mut table = ReservationTable::new(1, 1, 0);
        let grant = table.reserve(5, id(0), 1).unwrap();
        table.unlock(grant.slot, grant.codeblocks);
        assert_eq!(table.run_slot(5), 1);
    }

    #[test]
    fn test_stale_tick_never_evicts() {
        let mut table = ReservationTable::new(1, 1, 3);
        let grant = table.reserve(10, id(0), 1).unwrap();
        table.unlock(grant.slot, grant.codeblocks);
        assert_eq!(table.run_slot(2), 0);
        assert_eq!(table.occupied_count(), 1);
    }

    #[test]
    fn test_refused_reservation_keeps_grace_period() {
        let mut table = ReservationTable::new(1, 1, 4);
        let grant = table.reserve(0, id(0), 1).unwrap();

        // A request from a later tick that fails must not move the clock.
        assert_eq!(
            table.reserve(50, id(1), 1).unwrap_err(),
            ReserveFailure::NoFreeSlot
        );
        table.unlock(grant.slot, grant.codeblocks);

        let evicted_at = (1..60).find(|&tick| table.run_slot(tick) == 1);
        assert_eq!(evicted_at, Some(4));
    }

    #[test]
    fn test_leading_reservation_does_not_shift_other_releases() {
        let mut table = ReservationTable::new(2, 2, 4);
        let early = table.reserve(0, id(0), 1).unwrap();
        let late = table.reserve(30, id(1), 1).unwrap();
        table.unlock(early.slot, early.codeblocks);

        assert_eq!(table.run_slot(3), 0);
        assert_eq!(table.run_slot(4), 1);
        assert_eq!(table.state_of(&id(0)), None);
        assert_eq!(table.state_of(&id(1)), Some(SlotState::Locked));
        drop(late);
    }

    #[test]
    fn test_assigned_codeblocks_tracks_handles_and_evictions() {
        let mut table = ReservationTable::new(3, 6, 1);
        let a = table.reserve(0, id(0), 2).unwrap();
        let b = table.reserve(0, id(1), 3).unwrap();
        assert_eq!(table.assigned_codeblocks(), 5);
        assert_eq!(table.assigned_codeblocks() + table.free_codeblocks(), 6);

        table.unlock(a.slot, a.codeblocks);
        let a = table.reserve(0, id(0), 1).unwrap();
        assert_eq!(table.assigned_codeblocks(), 4);
        table.unlock(a.slot, a.codeblocks);

        assert_eq!(table.run_slot(1), 1);
        assert_eq!(table.assigned_codeblocks(), 3);
        assert_eq!(table.assigned_codeblocks() + table.free_codeblocks(), 6);
        table.unlock(b.slot, b.codeblocks);
    }

    #[test]
    fn test_stopped_table_refuses() {
        let mut table = ReservationTable::new(4, 4, 10);
        table.stop();
        assert!(table.is_stopped());
        assert_eq!(
            table.reserve(0, id(0), 1).unwrap_err(),
            ReserveFailure::PoolStopped
        );
        assert_eq!(table.occupied_count(), 0);
    }
}
