//! Transmission buffer pool
//!
//! A fixed number of reservation slots share a fixed codeblock budget.
//! Pipelines lock a buffer per (user, HARQ process) with
//! [`TxBufferPool::reserve`], write codeblocks through the returned
//! [`UniqueTxBuffer`], and drop the handle to unlock it. The content stays
//! in place for retransmissions until [`TxBufferPool::run_slot`] finds the
//! buffer idle for longer than the configured timeout.
//!
//! The reservation table behind the pool is internal; only its
//! [`SlotState`] is part of the API.
//!
//! ```compile_fail
//! use txbuf::pool::table::ReservationTable;
//! ```
//!
//! ```
//! use txbuf::pool::SlotState;
//! assert_ne!(SlotState::Free, SlotState::Locked);
//! ```

mod buffer_pool;
pub mod config;
pub mod controller;
pub mod handle;
pub mod stats;
pub(crate) mod table;

pub use buffer_pool::TxBufferPool;
pub use config::{TxBufferPoolConfig, TxBufferPoolConfigBuilder};
pub use controller::{create_tx_buffer_pool, TxBufferPoolController};
pub use handle::{TxBuffer, UniqueTxBuffer};
pub use stats::{AtomicTxBufferPoolStats, TxBufferPoolStats};
pub use table::SlotState;
