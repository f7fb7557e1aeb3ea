//! Surrogate key allocation for the Songplays fact table
//!
//! Each worker partition owns a disjoint id range: the partition index sits
//! in the upper 31 bits and a per-partition counter in the lower 33. Ids are
//! unique across the table and increase within a partition, but they are
//! neither dense nor ordered across partitions.

use crate::error::{Error, Result};

/// Bits reserved for the per-partition row counter
pub const PARTITION_SHIFT: u32 = 33;

/// Largest row counter a single partition can issue
pub const MAX_ROWS_PER_PARTITION: i64 = (1 << PARTITION_SHIFT) - 1;

/// Issues ids for one partition
#[derive(Debug, Clone)]
pub struct IdAllocator {
    base: i64,
    next: i64,
}

impl IdAllocator {
    /// Allocator for the partition at `index`
    pub fn for_partition(index: usize) -> Self {
        Self {
            base: (index as i64) << PARTITION_SHIFT,
            next: 0,
        }
    }

    /// Next id, or an error once the partition has issued 2^33 ids
    pub fn next_id(&mut self) -> Result<i64> {
        if self.next > MAX_ROWS_PER_PARTITION {
            return Err(Error::Other(format!(
                "songplay id range exhausted for partition {}",
                self.base >> PARTITION_SHIFT
            )));
        }
        let id = self.base | self.next;
        self.next += 1;
        Ok(id)
    }

    /// Ids issued so far
    pub fn issued(&self) -> i64 {
        self.next
    }
}
