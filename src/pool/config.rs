//! Transmission buffer pool configuration

use serde::{Deserialize, Serialize};

use crate::error::{Result, TxBufError};

/// Configuration for transmission buffer pools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBufferPoolConfig {
    /// Maximum codeblock size in bits
    pub max_codeblock_size: usize,
    /// Number of reservation slots (simultaneous buffer identifiers)
    pub nof_buffers: usize,
    /// Total codeblock budget shared by every buffer
    pub nof_codeblocks: usize,
    /// Idle ticks an unlocked buffer survives before eviction
    pub expire_timeout_slots: u64,
    /// Codeblock content is owned outside the pool
    pub external_soft_bits: bool,
}

impl Default for TxBufferPoolConfig {
    fn default() -> Self {
        Self {
            max_codeblock_size: 25344,
            nof_buffers: 256,
            nof_codeblocks: 4096,
            expire_timeout_slots: 100,
            external_soft_bits: false,
        }
    }
}

impl TxBufferPoolConfig {
    /// Set the maximum codeblock size in bits
    pub fn with_max_codeblock_size(mut self, size: usize) -> Self {
        self.max_codeblock_size = size;
        self
    }

    /// Set the number of reservation slots
    pub fn with_nof_buffers(mut self, count: usize) -> Self {
        self.nof_buffers = count;
        self
    }

    /// Set the codeblock budget
    pub fn with_nof_codeblocks(mut self, count: usize) -> Self {
        self.nof_codeblocks = count;
        self
    }

    /// Set the idle grace period in ticks
    pub fn with_expire_timeout_slots(mut self, ticks: u64) -> Self {
        self.expire_timeout_slots = ticks;
        self
    }

    /// Set whether codeblock content is owned externally
    pub fn with_external_soft_bits(mut self, external: bool) -> Self {
        self.external_soft_bits = external;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.nof_buffers == 0 {
            return Err(TxBufError::invalid_parameter(
                "nof_buffers",
                "Buffer count cannot be zero",
            ));
        }

        if self.nof_codeblocks == 0 {
            return Err(TxBufError::invalid_parameter(
                "nof_codeblocks",
                "Codeblock count cannot be zero",
            ));
        }

        if self.nof_codeblocks > u32::MAX as usize {
            return Err(TxBufError::invalid_parameter(
                "nof_codeblocks",
                "Codeblock count exceeds the 32-bit codeblock index space",
            ));
        }

        if !self.external_soft_bits && self.max_codeblock_size == 0 {
            return Err(TxBufError::invalid_parameter(
                "max_codeblock_size",
                "Codeblock size cannot be zero",
            ));
        }

        if self
            .nof_codeblocks
            .checked_mul(self.codeblock_bytes())
            .is_none()
        {
            return Err(TxBufError::invalid_parameter(
                "max_codeblock_size",
                "Codeblock arena size overflows",
            ));
        }

        Ok(())
    }

    /// Bytes of storage backing one codeblock
    pub fn codeblock_bytes(&self) -> usize {
        self.max_codeblock_size.div_ceil(8)
    }

    /// Bytes of the pre-sized codeblock arena
    pub fn total_memory_required(&self) -> usize {
        if self.external_soft_bits {
            0
        } else {
            self.nof_codeblocks * self.codeblock_bytes()
        }
    }
}

/// Builder pattern for transmission buffer pool configuration
#[derive(Debug, Default)]
pub struct TxBufferPoolConfigBuilder {
    config: TxBufferPoolConfig,
}

impl TxBufferPoolConfigBuilder {
    /// Create a new builder starting from the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum codeblock size in bits
    pub fn max_codeblock_size(mut self, size: usize) -> Self {
        self.config.max_codeblock_size = size;
        self
    }

    /// Set number of reservation slots
    pub fn nof_buffers(mut self, count: usize) -> Self {
        self.config.nof_buffers = count;
        self
    }

    /// Set codeblock budget
    pub fn nof_codeblocks(mut self, count: usize) -> Self {
        self.config.nof_codeblocks = count;
        self
    }

    /// Set grace period in ticks
    pub fn expire_timeout_slots(mut self, ticks: u64) -> Self {
        self.config.expire_timeout_slots = ticks;
        self
    }

    /// Keep codeblock content outside the pool
    pub fn external_soft_bits(mut self, external: bool) -> Self {
        self.config.external_soft_bits = external;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<TxBufferPoolConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
