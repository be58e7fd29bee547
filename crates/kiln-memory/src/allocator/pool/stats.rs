//! Pool usage snapshot

use core::fmt;

/// Point-in-time view of a pool's geometry and usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Usable bytes per block as requested at construction.
    pub block_size: usize,
    /// Stride between blocks in the region, including padding.
    pub block_stride: usize,
    /// Total number of blocks in the pool.
    pub block_count: usize,
    /// Blocks currently on the free list.
    pub free_blocks: usize,
    /// Blocks currently handed out.
    pub used_blocks: usize,
    /// Successful allocations since construction or reset.
    pub total_allocs: usize,
    /// Deallocations since construction or reset.
    pub total_deallocs: usize,
    /// High-water mark of simultaneously used blocks.
    pub peak_used_blocks: usize,
}

impl PoolStats {
    /// Fraction of blocks in use, from 0.0 to 1.0.
    pub fn utilization(&self) -> f32 {
        if self.block_count == 0 {
            0.0
        } else {
            self.used_blocks as f32 / self.block_count as f32
        }
    }

    /// Whether every block is handed out.
    pub const fn is_exhausted(&self) -> bool {
        self.free_blocks == 0
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} blocks used ({} bytes each, stride {}), peak {}, allocs {}, deallocs {}",
            self.used_blocks,
            self.block_count,
            self.block_size,
            self.block_stride,
            self.peak_used_blocks,
            self.total_allocs,
            self.total_deallocs,
        )
    }
}
