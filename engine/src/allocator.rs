// SPDX-License-Identifier: AGPL-3.0-only

//! Block sub-allocation of a device's memory budget.
//!
//! Each interface owns one allocator sized to the largest heap of its
//! device. Tasks reserve their buffer footprint rounded up to whole
//! allocation blocks; the [`Reservation`] returns the blocks when dropped.
//! Reserving never blocks: an exhausted budget is an error.

use crate::error::EngineError;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

#[derive(Debug)]
pub struct BlockAllocator {
    capacity: u64,
    in_use: Mutex<u64>,
}

impl BlockAllocator {
    #[must_use]
    pub fn new(capacity: u64) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            in_use: Mutex::new(0),
        })
    }

    #[must_use]
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    #[must_use]
    pub fn in_use(&self) -> u64 {
        *self.in_use.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn available(&self) -> u64 {
        self.capacity - self.in_use()
    }

    /// Reserve `bytes` rounded up to a multiple of `block`.
    ///
    /// # Errors
    ///
    /// [`EngineError::OutOfDeviceMemory`] when the rounded size exceeds what
    /// is left, [`EngineError::InvalidHardwareConfig`] for a zero block.
    pub fn reserve(self: &Arc<Self>, bytes: u64, block: u64) -> Result<Reservation, EngineError> {
        if block == 0 {
            return Err(EngineError::InvalidHardwareConfig(
                "allocation_block_size must be non-zero".into(),
            ));
        }
        let rounded = bytes
            .div_ceil(block)
            .checked_mul(block)
            .unwrap_or(u64::MAX);
        let mut in_use = self.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        let available = self.capacity - *in_use;
        if rounded > available {
            return Err(EngineError::OutOfDeviceMemory {
                requested: rounded,
                available,
            });
        }
        *in_use += rounded;
        debug!(bytes = rounded, in_use = *in_use, "blocks reserved");
        Ok(Reservation {
            allocator: Arc::clone(self),
            bytes: rounded,
        })
    }

    fn release(&self, bytes: u64) {
        let mut in_use = self.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        *in_use = in_use.saturating_sub(bytes);
    }
}

/// Blocks held by one task.
#[derive(Debug)]
#[must_use = "dropping a reservation releases its blocks"]
pub struct Reservation {
    allocator: Arc<BlockAllocator>,
    bytes: u64,
}

impl Reservation {
    #[must_use]
    pub const fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.allocator.release(self.bytes);
    }
}
