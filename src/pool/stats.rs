//! Transmission buffer pool statistics tracking

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::error::ReserveFailure;

/// Statistics snapshot for pool monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxBufferPoolStats {
    /// Successful reservations
    pub reservations: u64,
    /// Successful reservations of an identifier that was already occupied
    pub retransmissions: u64,
    /// Reservations refused because the identifier was locked
    pub failures_locked: u64,
    /// Reservations refused because no slot was free
    pub failures_no_slot: u64,
    /// Reservations refused for lack of codeblocks
    pub failures_no_codeblocks: u64,
    /// Reservations refused because the pool was stopped
    pub failures_stopped: u64,
    /// Handles released
    pub releases: u64,
    /// Buffers evicted by the housekeeping tick
    pub evictions: u64,
    /// Codeblock assignments resized on re-reservation
    pub resizes: u64,
    /// Peak number of simultaneously locked buffers
    pub peak_locked: usize,
    /// Occupied slots at snapshot time
    pub occupied_buffers: usize,
    /// Locked slots at snapshot time
    pub locked_buffers: usize,
    /// Codeblocks assigned to occupied slots at snapshot time
    pub used_codeblocks: usize,
    /// Free codeblocks at snapshot time
    pub free_codeblocks: usize,
}

impl TxBufferPoolStats {
    /// Total refused reservations
    pub fn failures(&self) -> u64 {
        self.failures_locked
            + self.failures_no_slot
            + self.failures_no_codeblocks
            + self.failures_stopped
    }

    /// Reservation success rate (0.0 to 1.0)
    pub fn success_rate(&self) -> f64 {
        let attempts = self.reservations + self.failures();
        if attempts == 0 {
            return 1.0;
        }
        self.reservations as f64 / attempts as f64
    }

    /// Get a summary string of the statistics
    pub fn summary(&self) -> String {
        format!(
            "TxBufferPoolStats {{ reservations: {}, retransmissions: {}, failures: {} \
             (locked: {}, no_slot: {}, no_codeblocks: {}, stopped: {}), releases: {}, \
             evictions: {}, resizes: {}, occupied: {}, locked: {}, peak_locked: {}, \
             used_codeblocks: {}, free_codeblocks: {}, success_rate: {:.2}% }}",
            self.reservations,
            self.retransmissions,
            self.failures(),
            self.failures_locked,
            self.failures_no_slot,
            self.failures_no_codeblocks,
            self.failures_stopped,
            self.releases,
            self.evictions,
            self.resizes,
            self.occupied_buffers,
            self.locked_buffers,
            self.peak_locked,
            self.used_codeblocks,
            self.free_codeblocks,
            self.success_rate() * 100.0
        )
    }
}

/// Thread-safe counters updated by the reservation table
#[derive(Debug, Default)]
pub struct AtomicTxBufferPoolStats {
    reservations: AtomicU64,
    retransmissions: AtomicU64,
    failures_locked: AtomicU64,
    failures_no_slot: AtomicU64,
    failures_no_codeblocks: AtomicU64,
    failures_stopped: AtomicU64,
    releases: AtomicU64,
    evictions: AtomicU64,
    resizes: AtomicU64,
    peak_locked: AtomicUsize,
}

impl AtomicTxBufferPoolStats {
    /// Create new atomic statistics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful reservation with `locked` buffers now held
    pub fn record_reservation(&self, retransmission: bool, locked: usize) {
        self.reservations.fetch_add(1, Ordering::Relaxed);
        if retransmission {
            self.retransmissions.fetch_add(1, Ordering::Relaxed);
        }
        self.peak_locked.fetch_max(locked, Ordering::Relaxed);
    }

    /// Record a refused reservation
    pub fn record_failure(&self, failure: &ReserveFailure) {
        let counter = match failure {
            ReserveFailure::IdentifierLocked => &self.failures_locked,
            ReserveFailure::NoFreeSlot => &self.failures_no_slot,
            ReserveFailure::InsufficientCodeblocks { .. } => &self.failures_no_codeblocks,
            ReserveFailure::PoolStopped => &self.failures_stopped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handle release
    pub fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an eviction
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a codeblock resize
    pub fn record_resize(&self) {
        self.resizes.fetch_add(1, Ordering::Relaxed);
    }

    /// Counter snapshot; occupancy fields are left at zero for the caller to fill
    pub fn snapshot(&self) -> TxBufferPoolStats {
        TxBufferPoolStats {
            reservations: self.reservations.load(Ordering::Relaxed),
            retransmissions: self.retransmissions.load(Ordering::Relaxed),
            failures_locked: self.failures_locked.load(Ordering::Relaxed),
            failures_no_slot: self.failures_no_slot.load(Ordering::Relaxed),
            failures_no_codeblocks: self.failures_no_codeblocks.load(Ordering::Relaxed),
            failures_stopped: self.failures_stopped.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            resizes: self.resizes.load(Ordering::Relaxed),
            peak_locked: self.peak_locked.load(Ordering::Relaxed),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_counters_by_reason() {
        let stats = AtomicTxBufferPoolStats::new();
        stats.record_failure(&ReserveFailure::IdentifierLocked);
        stats.record_failure(&ReserveFailure::NoFreeSlot);
        stats.record_failure(&ReserveFailure::NoFreeSlot);
        stats.record_failure(&ReserveFailure::InsufficientCodeblocks {
            requested: 2,
            available: 0,
        });
        stats.record_failure(&ReserveFailure::PoolStopped);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.failures_locked, 1);
        assert_eq!(snapshot.failures_no_slot, 2);
        assert_eq!(snapshot.failures_no_codeblocks, 1);
        assert_eq!(snapshot.failures_stopped, 1);
        assert_eq!(snapshot.failures(), 5);
    }

    #[test]
    fn test_success_rate_and_peak() {
        let stats = AtomicTxBufferPoolStats::new();
        assert_eq!(stats.snapshot().success_rate(), 1.0);

        stats.record_reservation(false, 1);
        stats.record_reservation(true, 3);
        stats.record_reservation(false, 2);
        stats.record_failure(&ReserveFailure::NoFreeSlot);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.reservations, 3);
        assert_eq!(snapshot.retransmissions, 1);
        assert_eq!(snapshot.peak_locked, 3);
        assert!((snapshot.success_rate() - 0.75).abs() < f64::EPSILON);
        assert!(snapshot.summary().contains("reservations: 3"));
    }
}
