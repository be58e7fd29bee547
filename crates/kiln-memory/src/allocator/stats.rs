//! Allocator statistics
//!
//! [`AtomicAllocatorStats`] is the always-safe recording sink; allocators
//! embed it behind [`OptionalStats`] so release configurations can skip
//! the bookkeeping entirely. [`AllocatorStats`] is the plain snapshot
//! handed to callers.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::utils::atomic_max;

/// Snapshot of allocator statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Bytes currently outstanding
    pub allocated_bytes: usize,
    /// High-water mark of outstanding bytes
    pub peak_allocated_bytes: usize,
    /// Number of successful allocations
    pub allocation_count: usize,
    /// Number of deallocations
    pub deallocation_count: usize,
    /// Number of failed allocation attempts
    pub failed_allocations: usize,
    /// Total bytes ever allocated (monotonic)
    pub total_bytes_allocated: usize,
    /// Total bytes ever deallocated (monotonic)
    pub total_bytes_deallocated: usize,
}

impl AllocatorStats {
    /// Bytes allocated but not yet deallocated.
    ///
    /// Equals `total_bytes_allocated - total_bytes_deallocated`; never
    /// underflows for a correctly paired workload.
    pub const fn outstanding_bytes(&self) -> usize {
        self.total_bytes_allocated
            .saturating_sub(self.total_bytes_deallocated)
    }

    /// Allocations that were never deallocated.
    pub const fn outstanding_allocations(&self) -> usize {
        self.allocation_count.saturating_sub(self.deallocation_count)
    }

    /// Mean size of successful allocations, zero when there were none.
    pub fn average_allocation_size(&self) -> usize {
        if self.allocation_count == 0 {
            0
        } else {
            self.total_bytes_allocated / self.allocation_count
        }
    }
}

impl fmt::Display for AllocatorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocs: {} ({} bytes), deallocs: {} ({} bytes), outstanding: {} bytes, peak: {} bytes, failed: {}",
            self.allocation_count,
            self.total_bytes_allocated,
            self.deallocation_count,
            self.total_bytes_deallocated,
            self.outstanding_bytes(),
            self.peak_allocated_bytes,
            self.failed_allocations,
        )
    }
}

/// Lock-free statistics recorder
#[derive(Debug, Default)]
pub struct AtomicAllocatorStats {
    allocated_bytes: AtomicUsize,
    peak_allocated_bytes: AtomicUsize,
    allocation_count: AtomicUsize,
    deallocation_count: AtomicUsize,
    failed_allocations: AtomicUsize,
    total_bytes_allocated: AtomicUsize,
    total_bytes_deallocated: AtomicUsize,
}

impl AtomicAllocatorStats {
    /// Fresh zeroed recorder.
    pub const fn new() -> Self {
        Self {
            allocated_bytes: AtomicUsize::new(0),
            peak_allocated_bytes: AtomicUsize::new(0),
            allocation_count: AtomicUsize::new(0),
            deallocation_count: AtomicUsize::new(0),
            failed_allocations: AtomicUsize::new(0),
            total_bytes_allocated: AtomicUsize::new(0),
            total_bytes_deallocated: AtomicUsize::new(0),
        }
    }

    /// Records a successful allocation of `size` bytes.
    pub fn record_allocation(&self, size: usize) {
        let outstanding = self.allocated_bytes.fetch_add(size, Ordering::Relaxed) + size;
        atomic_max(&self.peak_allocated_bytes, outstanding);
        self.allocation_count.fetch_add(1, Ordering::Relaxed);
        self.total_bytes_allocated.fetch_add(size, Ordering::Relaxed);
    }

    /// Records a deallocation of `size` bytes.
    pub fn record_deallocation(&self, size: usize) {
        debug_assert!(
            self.allocated_bytes.load(Ordering::Relaxed) >= size,
            "deallocated more bytes than were allocated"
        );
        self.allocated_bytes.fetch_sub(size, Ordering::Relaxed);
        self.deallocation_count.fetch_add(1, Ordering::Relaxed);
        self.total_bytes_deallocated
            .fetch_add(size, Ordering::Relaxed);
    }

    /// Records a failed allocation attempt.
    pub fn record_failure(&self) {
        self.failed_allocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a consistent-enough snapshot of all counters.
    pub fn snapshot(&self) -> AllocatorStats {
        AllocatorStats {
            allocated_bytes: self.allocated_bytes.load(Ordering::Relaxed),
            peak_allocated_bytes: self.peak_allocated_bytes.load(Ordering::Relaxed),
            allocation_count: self.allocation_count.load(Ordering::Relaxed),
            deallocation_count: self.deallocation_count.load(Ordering::Relaxed),
            failed_allocations: self.failed_allocations.load(Ordering::Relaxed),
            total_bytes_allocated: self.total_bytes_allocated.load(Ordering::Relaxed),
            total_bytes_deallocated: self.total_bytes_deallocated.load(Ordering::Relaxed),
        }
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        self.allocated_bytes.store(0, Ordering::Relaxed);
        self.peak_allocated_bytes.store(0, Ordering::Relaxed);
        self.allocation_count.store(0, Ordering::Relaxed);
        self.deallocation_count.store(0, Ordering::Relaxed);
        self.failed_allocations.store(0, Ordering::Relaxed);
        self.total_bytes_allocated.store(0, Ordering::Relaxed);
        self.total_bytes_deallocated.store(0, Ordering::Relaxed);
    }
}

/// Statistics recorder that can be disabled at construction time.
///
/// Recording methods are no-ops when disabled; snapshots return zeroes.
#[derive(Debug)]
pub struct OptionalStats {
    enabled: bool,
    stats: AtomicAllocatorStats,
}

impl OptionalStats {
    /// Recorder that is active only when `enabled` is true.
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            stats: AtomicAllocatorStats::new(),
        }
    }

    /// Whether recording is active.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Records a successful allocation of `size` bytes.
    #[inline]
    pub fn record_allocation(&self, size: usize) {
        if self.enabled {
            self.stats.record_allocation(size);
        }
    }

    /// Records a deallocation of `size` bytes.
    #[inline]
    pub fn record_deallocation(&self, size: usize) {
        if self.enabled {
            self.stats.record_deallocation(size);
        }
    }

    /// Records a failed allocation attempt.
    #[inline]
    pub fn record_failure(&self) {
        if self.enabled {
            self.stats.record_failure();
        }
    }

    /// Snapshot of the counters (zeroes when disabled).
    pub fn snapshot(&self) -> AllocatorStats {
        self.stats.snapshot()
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        self.stats.reset();
    }
}
