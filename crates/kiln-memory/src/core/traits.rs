//! Core traits for memory management
//!
//! Capacity reporting and bulk-reset interfaces implemented by the
//! allocators in this crate.

/// Memory usage tracking trait
///
/// Implemented by allocators that know how much of their capacity is in
/// use. Provides both basic capacity information and convenience methods
/// for monitoring.
pub trait MemoryUsage {
    /// Get currently used memory in bytes
    fn used_memory(&self) -> usize;

    /// Get available memory in bytes (if known)
    fn available_memory(&self) -> Option<usize>;

    /// Get total memory capacity in bytes (if known)
    fn total_memory(&self) -> Option<usize> {
        match (self.used_memory(), self.available_memory()) {
            (used, Some(available)) => Some(used + available),
            _ => None,
        }
    }

    /// Returns memory usage as a percentage (0.0 to 100.0)
    ///
    /// Returns `None` if total memory is unknown or zero.
    fn memory_usage_percent(&self) -> Option<f32> {
        self.total_memory().map(|total| {
            if total == 0 {
                0.0
            } else {
                (self.used_memory() as f32 / total as f32) * 100.0
            }
        })
    }

    /// Checks if memory usage is above the specified percentage threshold
    fn is_memory_pressure(&self, threshold_percent: f32) -> Option<bool> {
        self.memory_usage_percent()
            .map(|usage| usage >= threshold_percent)
    }

    /// Returns a snapshot of the basic usage numbers
    fn memory_usage(&self) -> BasicMemoryUsage {
        BasicMemoryUsage {
            used: self.used_memory(),
            available: self.available_memory(),
            total: self.total_memory(),
            usage_percent: self.memory_usage_percent(),
        }
    }
}

/// Basic memory usage information
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasicMemoryUsage {
    /// Currently used memory in bytes
    pub used: usize,
    /// Available memory in bytes (None if unlimited)
    pub available: Option<usize>,
    /// Total memory capacity in bytes (None if unlimited)
    pub total: Option<usize>,
    /// Memory usage as percentage (None if cannot be calculated)
    pub usage_percent: Option<f32>,
}

impl core::fmt::Display for BasicMemoryUsage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "used: {} bytes", self.used)?;

        if let Some(total) = self.total {
            write!(f, ", total: {total} bytes")?;
        }

        if let Some(percent) = self.usage_percent {
            write!(f, " ({percent:.1}%)")?;
        }

        Ok(())
    }
}

/// Resettable memory manager
///
/// Trait for allocators that support resetting to initial state.
/// Resetting invalidates all previous allocations.
pub trait Resettable {
    /// Reset allocator to initial state
    ///
    /// # Safety
    /// - All pointers allocated before reset become invalid immediately
    /// - Caller must ensure no live references into the allocator exist
    unsafe fn reset(&self);

    /// Check if this allocator can be reset right now
    fn can_reset(&self) -> bool {
        true
    }

    /// Resets the allocator only if it's safe to do so
    ///
    /// Returns `true` if reset was performed.
    ///
    /// # Safety
    /// Same requirements as [`Resettable::reset`], when performed.
    unsafe fn try_reset(&self) -> bool {
        if self.can_reset() {
            // SAFETY: caller upholds the reset contract.
            unsafe { self.reset() };
            true
        } else {
            false
        }
    }
}

/// Statistics provider trait
///
/// Implemented by allocators that collect allocation statistics.
pub trait StatisticsProvider {
    /// Get a snapshot of the current statistics
    fn statistics(&self) -> crate::allocator::AllocatorStats;

    /// Reset all statistics counters
    fn reset_statistics(&self);

    /// Check if statistics collection is enabled
    fn statistics_enabled(&self) -> bool {
        true
    }
}
