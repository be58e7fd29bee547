//! Allocation tracking wrapper
//!
//! [`TrackedAllocator`] decorates any [`Allocator`] with atomic counters
//! for bytes and call counts, cumulative and outstanding. Leak detection
//! is a question the caller asks at shutdown ([`has_leaks`]); dropping a
//! wrapper with outstanding allocations logs an error but does not panic.
//!
//! [`has_leaks`]: TrackedAllocator::has_leaks

use core::alloc::Layout;
use core::mem::ManuallyDrop;
use core::ptr::NonNull;

use crate::allocator::stats::{AllocatorStats, AtomicAllocatorStats};
use crate::allocator::traits::{Allocator, ThreadSafeAllocator};
use crate::core::{MemoryUsage, StatisticsProvider};
use crate::error::AllocResult;

/// Wraps an allocator and records every allocation and deallocation.
#[derive(Debug, Default)]
pub struct TrackedAllocator<A: Allocator> {
    inner: A,
    stats: AtomicAllocatorStats,
}

impl<A: Allocator> TrackedAllocator<A> {
    /// Wraps `inner` with fresh counters.
    pub const fn new(inner: A) -> Self {
        Self {
            inner,
            stats: AtomicAllocatorStats::new(),
        }
    }

    /// Cumulative bytes ever allocated through this wrapper.
    pub fn allocated_bytes(&self) -> usize {
        self.stats.snapshot().total_bytes_allocated
    }

    /// Cumulative bytes ever deallocated through this wrapper.
    pub fn deallocated_bytes(&self) -> usize {
        self.stats.snapshot().total_bytes_deallocated
    }

    /// Bytes allocated but not yet deallocated.
    pub fn outstanding_bytes(&self) -> usize {
        self.stats.snapshot().outstanding_bytes()
    }

    /// High-water mark of outstanding bytes.
    pub fn peak_bytes(&self) -> usize {
        self.stats.snapshot().peak_allocated_bytes
    }

    /// Number of successful allocations.
    pub fn allocation_count(&self) -> usize {
        self.stats.snapshot().allocation_count
    }

    /// Number of deallocations.
    pub fn deallocation_count(&self) -> usize {
        self.stats.snapshot().deallocation_count
    }

    /// Number of failed allocation attempts.
    pub fn failed_allocations(&self) -> usize {
        self.stats.snapshot().failed_allocations
    }

    /// Whether any allocation has not been paired with a deallocation.
    ///
    /// Meaningful at shutdown, once all users of the allocator are done.
    pub fn has_leaks(&self) -> bool {
        let snap = self.stats.snapshot();
        snap.total_bytes_allocated != snap.total_bytes_deallocated
            || snap.allocation_count != snap.deallocation_count
    }

    /// Number of allocations never deallocated.
    pub fn potential_leaks(&self) -> usize {
        self.stats.snapshot().outstanding_allocations()
    }

    /// Full statistics snapshot.
    pub fn detailed_stats(&self) -> AllocatorStats {
        self.stats.snapshot()
    }

    /// Zeroes every counter.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Borrows the wrapped allocator.
    pub const fn inner(&self) -> &A {
        &self.inner
    }

    /// Unwraps the inner allocator, discarding the counters.
    ///
    /// Skips the leak diagnostic; the caller takes back responsibility
    /// for whatever is still outstanding.
    pub fn into_inner(self) -> A {
        let this = ManuallyDrop::new(self);
        // SAFETY: this is never dropped, so inner is read exactly once;
        // the counters hold no resources.
        unsafe { core::ptr::read(&this.inner) }
    }
}

impl<A: Allocator> Drop for TrackedAllocator<A> {
    fn drop(&mut self) {
        let snap = self.stats.snapshot();
        if snap.outstanding_bytes() > 0 || snap.outstanding_allocations() > 0 {
            #[cfg(feature = "logging")]
            tracing::error!(
                outstanding_bytes = snap.outstanding_bytes(),
                outstanding_allocations = snap.outstanding_allocations(),
                "allocator dropped with outstanding allocations"
            );
        }
    }
}

// SAFETY: forwards to the inner allocator; the counters never affect the
// returned memory.
unsafe impl<A: Allocator> Allocator for TrackedAllocator<A> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        // SAFETY: caller upholds the allocate contract.
        match unsafe { self.inner.allocate(layout) } {
            Ok(ptr) => {
                self.stats.record_allocation(layout.size());
                Ok(ptr)
            }
            Err(err) => {
                self.stats.record_failure();
                Err(err)
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: caller upholds the deallocate contract.
        unsafe { self.inner.deallocate(ptr, layout) };
        self.stats.record_deallocation(layout.size());
    }

    fn max_allocation_size(&self) -> usize {
        self.inner.max_allocation_size()
    }

    fn supports_zero_sized_allocs(&self) -> bool {
        self.inner.supports_zero_sized_allocs()
    }
}

// SAFETY: AtomicAllocatorStats is lock-free; thread safety reduces to the
// inner allocator's.
unsafe impl<A: ThreadSafeAllocator> ThreadSafeAllocator for TrackedAllocator<A> {}

impl<A: Allocator> MemoryUsage for TrackedAllocator<A> {
    fn used_memory(&self) -> usize {
        self.stats.snapshot().allocated_bytes
    }

    fn available_memory(&self) -> Option<usize> {
        None
    }
}

impl<A: Allocator> StatisticsProvider for TrackedAllocator<A> {
    fn statistics(&self) -> AllocatorStats {
        self.stats.snapshot()
    }

    fn reset_statistics(&self) {
        self.stats.reset();
    }
}

/// Extension that wraps any allocator in a [`TrackedAllocator`].
pub trait TrackExt: Allocator + Sized {
    /// Decorates `self` with allocation tracking.
    fn with_tracking(self) -> TrackedAllocator<Self> {
        TrackedAllocator::new(self)
    }
}

impl<A: Allocator + Sized> TrackExt for A {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::SystemAllocator;

    #[test]
    fn counters_follow_allocations() {
        let alloc = SystemAllocator::new().with_tracking();
        let layout = Layout::from_size_align(128, 8).unwrap();

        assert_eq!(alloc.allocated_bytes(), 0);
        assert!(!alloc.has_leaks());

        // SAFETY: non-zero layout, deallocated with the same layout.
        unsafe {
            let a = alloc.allocate(layout).expect("allocation failed");
            let b = alloc.allocate(layout).expect("allocation failed");

            assert_eq!(alloc.allocated_bytes(), 256);
            assert_eq!(alloc.outstanding_bytes(), 256);
            assert_eq!(alloc.allocation_count(), 2);
            assert!(alloc.has_leaks());
            assert_eq!(alloc.potential_leaks(), 2);

            alloc.deallocate(a.cast(), layout);
            alloc.deallocate(b.cast(), layout);
        }

        assert_eq!(alloc.deallocated_bytes(), 256);
        assert_eq!(alloc.outstanding_bytes(), 0);
        assert_eq!(alloc.peak_bytes(), 256);
        assert!(!alloc.has_leaks());
    }

    #[test]
    fn into_inner_returns_backing() {
        let tracked = SystemAllocator::new().with_tracking();
        let layout = Layout::from_size_align(32, 8).unwrap();
        // SAFETY: non-zero layout, deallocated with the same layout.
        unsafe {
            let ptr = tracked.allocate(layout).expect("allocation failed");
            tracked.deallocate(ptr.cast(), layout);
        }
        let _inner: SystemAllocator = tracked.into_inner();
    }

    #[test]
    fn reset_clears_history() {
        let alloc = SystemAllocator::new().with_tracking();
        let layout = Layout::from_size_align(64, 8).unwrap();
        // SAFETY: non-zero layout, deallocated with the same layout.
        unsafe {
            let ptr = alloc.allocate(layout).expect("allocation failed");
            alloc.deallocate(ptr.cast(), layout);
        }
        alloc.reset_stats();
        assert_eq!(alloc.detailed_stats(), AllocatorStats::default());
    }
}
