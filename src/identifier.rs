//! Buffer identifiers and logical time

use std::fmt;

/// Logical time unit driving reservation aging and eviction
pub type Tick = u64;

/// Identifies one transmission buffer: the owning user and its HARQ process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TrxBufferIdentifier {
    rnti: u16,
    harq: u8,
}

impl TrxBufferIdentifier {
    /// Create an identifier from a user RNTI and a HARQ process number
    pub const fn new(rnti: u16, harq: u8) -> Self {
        Self { rnti, harq }
    }

    /// Radio network temporary identifier of the owning user
    pub const fn rnti(&self) -> u16 {
        self.rnti
    }

    /// HARQ process number
    pub const fn harq(&self) -> u8 {
        self.harq
    }
}

impl fmt::Display for TrxBufferIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rnti={:#06x} h_id={}", self.rnti, self.harq)
    }
}
