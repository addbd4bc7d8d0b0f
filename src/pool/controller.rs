//! Pool lifecycle: construction and graceful shutdown

use std::time::Duration;

use crate::error::Result;

use super::{buffer_pool::TxBufferPool, config::TxBufferPoolConfig};

/// Owns a transmission buffer pool and controls its shutdown
#[derive(Debug)]
pub struct TxBufferPoolController {
    pool: TxBufferPool,
}

impl TxBufferPoolController {
    /// Validate `config` and build the pool
    pub fn new(config: TxBufferPoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pool: TxBufferPool::new(config),
        })
    }

    /// The pool; clone it to share with pipeline threads
    pub fn get_pool(&self) -> &TxBufferPool {
        &self.pool
    }

    /// Refuse new reservations and block until every granted handle is released.
    ///
    /// Calling it again after the pool drained returns immediately.
    pub fn stop(&self) {
        self.pool.close_and_drain(None);
    }

    /// Like [`stop`](Self::stop) but gives up waiting after `timeout`.
    ///
    /// Returns true if every handle was released in time. The pool stays
    /// closed either way.
    pub fn stop_timeout(&self, timeout: Duration) -> bool {
        self.pool.close_and_drain(Some(timeout))
    }

    /// Whether [`stop`](Self::stop) has been called
    pub fn is_stopped(&self) -> bool {
        self.pool.is_stopped()
    }
}

/// Create a transmission buffer pool from `config`
pub fn create_tx_buffer_pool(config: TxBufferPoolConfig) -> Result<TxBufferPoolController> {
    TxBufferPoolController::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::TrxBufferIdentifier;

    fn small_config() -> TxBufferPoolConfig {
        TxBufferPoolConfig::default()
            .with_max_codeblock_size(16)
            .with_nof_buffers(2)
            .with_nof_codeblocks(2)
            .with_expire_timeout_slots(10)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = small_config().with_nof_buffers(0);
        assert!(create_tx_buffer_pool(config).is_err());
    }

    #[test]
    fn test_stop_without_handles_returns() {
        let controller = create_tx_buffer_pool(small_config()).unwrap();
        assert!(!controller.is_stopped());
        controller.stop();
        assert!(controller.is_stopped());
        controller.stop();
    }

    #[test]
    fn test_stop_timeout_with_held_handle() {
        let controller = create_tx_buffer_pool(small_config()).unwrap();
        let mut buffer = controller
            .get_pool()
            .reserve(0, TrxBufferIdentifier::new(1, 0), 1);
        assert!(buffer.is_valid());

        assert!(!controller.stop_timeout(Duration::from_millis(5)));
        assert!(controller.is_stopped());

        buffer.release();
        assert!(controller.stop_timeout(Duration::from_millis(5)));
    }
}
