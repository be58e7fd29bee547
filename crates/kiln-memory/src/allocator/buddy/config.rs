//! Buddy allocator configuration

/// Tuning knobs for [`BuddyAllocator`](super::BuddyAllocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuddyConfig {
    /// Smallest block the tree will split down to. Power of two.
    ///
    /// Requests below this size still consume a block of this size, so a
    /// lower value trades tree depth for less internal fragmentation.
    pub min_block_size: usize,
    /// Collect allocation statistics.
    pub track_stats: bool,
    /// Byte pattern written into fresh blocks, if any.
    pub alloc_pattern: Option<u8>,
    /// Byte pattern written into freed blocks, if any.
    pub dealloc_pattern: Option<u8>,
}

impl Default for BuddyConfig {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::debug()
        } else {
            Self::production()
        }
    }
}

impl BuddyConfig {
    /// Default smallest block size in bytes.
    pub const DEFAULT_MIN_BLOCK_SIZE: usize = 64;

    /// Lean configuration: no statistics, no fill patterns.
    pub const fn production() -> Self {
        Self {
            min_block_size: Self::DEFAULT_MIN_BLOCK_SIZE,
            track_stats: false,
            alloc_pattern: None,
            dealloc_pattern: None,
        }
    }

    /// Diagnostic configuration with statistics and fill patterns.
    ///
    /// Fresh blocks are filled with `0xCC` and freed blocks with `0xDD`.
    pub const fn debug() -> Self {
        Self {
            min_block_size: Self::DEFAULT_MIN_BLOCK_SIZE,
            track_stats: true,
            alloc_pattern: Some(0xCC),
            dealloc_pattern: Some(0xDD),
        }
    }

    /// Replaces the minimum block size.
    #[must_use]
    pub const fn with_min_block_size(mut self, min_block_size: usize) -> Self {
        self.min_block_size = min_block_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_differ_in_diagnostics() {
        assert!(BuddyConfig::debug().track_stats);
        assert!(!BuddyConfig::production().track_stats);
        assert_eq!(
            BuddyConfig::production().min_block_size,
            BuddyConfig::DEFAULT_MIN_BLOCK_SIZE
        );
    }

    #[test]
    fn builder_overrides_min_block() {
        let config = BuddyConfig::production().with_min_block_size(128);
        assert_eq!(config.min_block_size, 128);
    }
}
