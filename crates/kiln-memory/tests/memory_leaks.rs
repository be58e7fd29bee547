//! Leak detection across allocator compositions
//!
//! A tracking wrapper shared by reference lets these tests watch region
//! allocators return every byte they took from their backing store.

use kiln_memory::{
    Allocator, BuddyAllocator, BuddyConfig, PoolAllocator, PoolConfig, SystemAllocator, TrackExt,
    TypedAllocator,
};
use std::alloc::Layout;

#[test]
fn test_pool_returns_its_region_on_drop() {
    let tracked = SystemAllocator::new().with_tracking();

    {
        let pool = PoolAllocator::with_backing(&tracked, 64, 8, 16, PoolConfig::default())
            .expect("Failed to create pool");

        assert!(tracked.has_leaks());
        assert_eq!(tracked.outstanding_bytes(), 16 * 64);

        unsafe {
            let layout = Layout::from_size_align(64, 8).unwrap();
            let ptr = pool.allocate(layout).expect("Allocation failed");
            pool.deallocate(ptr.cast(), layout);
        }

        // Pool traffic never reaches the backing allocator.
        assert_eq!(tracked.allocation_count(), 1);
    }

    assert!(!tracked.has_leaks());
    assert_eq!(tracked.outstanding_bytes(), 0);
    assert_eq!(tracked.potential_leaks(), 0);
}

#[test]
fn test_buddy_returns_its_region_on_drop() {
    let tracked = SystemAllocator::new().with_tracking();

    {
        let buddy = BuddyAllocator::with_backing(&tracked, 4096, BuddyConfig::default())
            .expect("Failed to create buddy allocator");

        assert_eq!(tracked.outstanding_bytes(), 4096);

        unsafe {
            let layout = Layout::from_size_align(300, 8).unwrap();
            let ptr = buddy.allocate(layout).expect("Allocation failed");
            buddy.deallocate(ptr.cast(), layout);
        }
    }

    assert!(!tracked.has_leaks());
    assert_eq!(tracked.allocated_bytes(), tracked.deallocated_bytes());
}

#[test]
fn test_tracked_conservation_over_mixed_traffic() {
    let tracked = SystemAllocator::new().with_tracking();

    unsafe {
        let small = Layout::from_size_align(32, 8).unwrap();
        let large = Layout::from_size_align(8192, 64).unwrap();

        let a = tracked.allocate(small).expect("Small allocation failed");
        let b = tracked.allocate(large).expect("Large allocation failed");
        let c = tracked.allocate(small).expect("Small allocation failed");

        assert_eq!(tracked.allocated_bytes(), 32 + 8192 + 32);
        assert_eq!(tracked.peak_bytes(), 32 + 8192 + 32);

        tracked.deallocate(b.cast(), large);
        assert_eq!(tracked.outstanding_bytes(), 64);
        assert_eq!(tracked.potential_leaks(), 2);

        tracked.deallocate(a.cast(), small);
        tracked.deallocate(c.cast(), small);
    }

    let stats = tracked.detailed_stats();
    assert_eq!(stats.total_bytes_allocated, stats.total_bytes_deallocated);
    assert_eq!(stats.allocation_count, stats.deallocation_count);
    assert_eq!(stats.failed_allocations, 0);
}

#[test]
fn test_typed_allocations_do_not_leak() {
    let tracked = SystemAllocator::new().with_tracking();

    let values = tracked
        .alloc_array_with::<u32>(64, |i| i as u32)
        .expect("Array allocation failed");
    let single = tracked.alloc_value(7u8).expect("Value allocation failed");

    unsafe {
        tracked.dealloc_array(values, 64);
        tracked.dealloc_value(single);
    }

    assert!(!tracked.has_leaks());
}

#[test]
fn test_leak_is_visible_until_freed() {
    let tracked = SystemAllocator::new().with_tracking();
    let layout = Layout::from_size_align(128, 8).unwrap();

    unsafe {
        let ptr = tracked.allocate(layout).expect("Allocation failed");

        assert!(tracked.has_leaks());
        assert_eq!(tracked.potential_leaks(), 1);
        assert_eq!(tracked.outstanding_bytes(), 128);

        tracked.deallocate(ptr.cast(), layout);
    }

    assert!(!tracked.has_leaks());

    // Shutdown check is idempotent.
    assert!(!tracked.has_leaks());
    assert_eq!(tracked.outstanding_bytes(), 0);
}
