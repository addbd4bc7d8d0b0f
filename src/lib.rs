//! # txbuf - Transmission Buffer Pool
//!
//! txbuf manages the storage lifecycle of transmission buffers for
//! radio-access-network encoding pipelines. Each buffer belongs to one
//! (user, HARQ process) pair and keeps its codeblock content across
//! retransmissions until it has been idle for a configured number of ticks.
//!
//! ## Features
//!
//! - **Bounded**: fixed number of buffers and fixed codeblock budget, sized once
//! - **Exclusive handles**: at most one live handle per buffer, released on drop
//! - **Retransmission persistence**: re-reserving an idle buffer returns the same storage
//! - **Tick-driven eviction**: idle buffers are reclaimed by a housekeeping tick
//! - **Graceful shutdown**: `stop()` closes the pool and waits for outstanding handles
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │            TxBufferPoolController                │
//! │   config · stop() / drain                        │
//! ├──────────────────────────────────────────────────┤
//! │  TxBufferPool (Mutex)     │  SoftBitArena        │
//! │  - ReservationTable       │  - codeblock bytes   │
//! │  - CodeblockStore         │  - lock-free access  │
//! │  - eviction on run_slot   │    through handles   │
//! └──────────────────────────────────────────────────┘
//!           │ reserve()                 ▲
//!           ▼                           │ codeblock_mut()
//! ┌──────────────────────────────────────────────────┐
//! │  UniqueTxBuffer (move-only, unlocks on drop)     │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use txbuf::{create_tx_buffer_pool, TrxBufferIdentifier, TxBufferPoolConfig};
//!
//! let config = TxBufferPoolConfig::default()
//!     .with_max_codeblock_size(16)
//!     .with_nof_buffers(4)
//!     .with_nof_codeblocks(8)
//!     .with_expire_timeout_slots(10);
//! let controller = create_tx_buffer_pool(config).unwrap();
//! let pool = controller.get_pool();
//!
//! let id = TrxBufferIdentifier::new(0x4601, 0);
//! let mut buffer = pool.reserve(0, id, 2);
//! assert!(buffer.is_valid());
//! buffer.get_mut().codeblock_mut(0, 8).insert(0xa5, 0, 8);
//! drop(buffer);
//!
//! // Retransmission: same storage, same content.
//! let buffer = pool.reserve(1, id, 2);
//! assert_eq!(buffer.get().codeblock(0, 8).extract(0, 8), 0xa5);
//! drop(buffer);
//!
//! controller.stop();
//! ```

pub mod codeblocks;
pub mod error;
pub mod identifier;
pub mod pool;

// Main API re-exports
pub use codeblocks::{BitBuffer, CodeblockId};
pub use error::{CodeblockShortage, ReserveFailure, Result, TxBufError};
pub use identifier::{Tick, TrxBufferIdentifier};
pub use pool::{
    create_tx_buffer_pool, AtomicTxBufferPoolStats, TxBuffer, TxBufferPool, TxBufferPoolConfig,
    TxBufferPoolConfigBuilder, TxBufferPoolController, TxBufferPoolStats, UniqueTxBuffer,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
