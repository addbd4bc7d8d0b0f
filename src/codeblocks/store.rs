//! Codeblock store - fixed budget of codeblock indices
//!
//! The store only does free/used accounting. It never touches codeblock
//! content, so data kept by a buffer survives every store operation that
//! does not hand its codeblocks back.

use crate::error::CodeblockShortage;

/// Index of a codeblock inside the store
pub type CodeblockId = u32;

/// Free set of codeblock indices handed out in variable-length assignments
#[derive(Debug)]
pub struct CodeblockStore {
    /// Free indices, lowest index on top of the stack
    free: Vec<CodeblockId>,
    /// Total number of codeblocks
    capacity: usize,
}

impl CodeblockStore {
    /// Create a store with `capacity` free codeblocks
    pub fn new(capacity: usize) -> Self {
        let free = (0..capacity as CodeblockId).rev().collect();
        Self { free, capacity }
    }

    /// Total number of codeblocks
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of codeblocks not assigned to any buffer
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of codeblocks currently assigned
    pub fn used_count(&self) -> usize {
        self.capacity - self.free.len()
    }

    /// Append `count` free codeblocks to `assignment`.
    ///
    /// Either all `count` codeblocks are appended or none are.
    pub fn acquire(
        &mut self,
        count: usize,
        assignment: &mut Vec<CodeblockId>,
    ) -> Result<(), CodeblockShortage> {
        let available = self.free.len();
        if count > available {
            return Err(CodeblockShortage {
                requested: count,
                available,
            });
        }

        assignment.extend(self.free.drain(available - count..).rev());
        Ok(())
    }

    /// Return every codeblock in `assignment` to the free set, leaving it empty
    pub fn release(&mut self, assignment: &mut Vec<CodeblockId>) {
        self.free.extend(assignment.drain(..).rev());
        debug_assert!(self.free.len() <= self.capacity, "codeblock released twice");
    }

    /// Grow or shrink `assignment` to `new_count` codeblocks in place.
    ///
    /// Shrinking releases the trailing codeblocks. Growing appends new ones;
    /// when the free set is too small the assignment is left untouched.
    pub fn resize(
        &mut self,
        assignment: &mut Vec<CodeblockId>,
        new_count: usize,
    ) -> Result<(), CodeblockShortage> {
        let current = assignment.len();
        if new_count <= current {
            self.free.extend(assignment.drain(new_count..).rev());
            return Ok(());
        }

        self.acquire(new_count - current, assignment)
    }
}
