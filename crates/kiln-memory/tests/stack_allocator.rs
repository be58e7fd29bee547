//! Integration tests for the stack allocator

use kiln_memory::{
    AllocError, Allocator, MemoryUsage, Resettable, StackAllocator, StackConfig, StackFrame,
};
use std::alloc::Layout;

#[test]
fn test_stack_allocator_basic() {
    let allocator =
        StackAllocator::with_config(4096, StackConfig::default()).expect("Failed to create stack");

    unsafe {
        let layout = Layout::from_size_align(128, 8).unwrap();
        let ptr = allocator.allocate(layout).expect("Allocation failed");

        std::ptr::write_bytes(ptr.cast::<u8>().as_ptr(), 0x55, 128);
        assert_eq!(*ptr.cast::<u8>().as_ptr(), 0x55);

        allocator.deallocate(ptr.cast(), layout);
    }
}

#[test]
fn test_stack_allocator_lifo() {
    let allocator =
        StackAllocator::with_config(4096, StackConfig::default()).expect("Failed to create stack");

    unsafe {
        let layout = Layout::from_size_align(64, 8).unwrap();

        let ptr_a = allocator.allocate(layout).expect("Allocation A failed");
        let ptr_b = allocator.allocate(layout).expect("Allocation B failed");
        let ptr_c = allocator.allocate(layout).expect("Allocation C failed");

        std::ptr::write_bytes(ptr_a.cast::<u8>().as_ptr(), 0xAA, 64);
        std::ptr::write_bytes(ptr_b.cast::<u8>().as_ptr(), 0xBB, 64);
        std::ptr::write_bytes(ptr_c.cast::<u8>().as_ptr(), 0xCC, 64);

        assert_eq!(*ptr_a.cast::<u8>().as_ptr(), 0xAA);
        assert_eq!(*ptr_b.cast::<u8>().as_ptr(), 0xBB);
        assert_eq!(*ptr_c.cast::<u8>().as_ptr(), 0xCC);

        // Deallocate in LIFO order: C, B, A
        allocator.deallocate(ptr_c.cast(), layout);
        allocator.deallocate(ptr_b.cast(), layout);
        allocator.deallocate(ptr_a.cast(), layout);
    }

    assert_eq!(allocator.used(), 0);
}

#[test]
fn test_stack_allocator_freed_space_is_reused() {
    let allocator =
        StackAllocator::with_config(4096, StackConfig::default()).expect("Failed to create stack");

    unsafe {
        let layout = Layout::from_size_align(64, 8).unwrap();

        let ptr_a = allocator.allocate(layout).expect("Allocation A failed");
        let addr_a = ptr_a.cast::<u8>().as_ptr() as usize;
        allocator.deallocate(ptr_a.cast(), layout);

        let ptr_b = allocator.allocate(layout).expect("Allocation B failed");
        assert_eq!(ptr_b.cast::<u8>().as_ptr() as usize, addr_a);

        allocator.deallocate(ptr_b.cast(), layout);
    }
}

#[test]
fn test_stack_allocator_marker() {
    let allocator =
        StackAllocator::with_config(4096, StackConfig::default()).expect("Failed to create stack");

    unsafe {
        let layout = Layout::from_size_align(64, 8).unwrap();

        let marker = allocator.mark();

        let ptr1 = allocator.allocate(layout).expect("Allocation 1 failed");
        let _ptr2 = allocator.allocate(layout).expect("Allocation 2 failed");
        let addr1 = ptr1.cast::<u8>().as_ptr() as usize;

        allocator
            .restore_to_marker(marker)
            .expect("Marker restore failed");
        assert_eq!(allocator.used(), 0);

        // Space is reused from the marker position.
        let ptr3 = allocator.allocate(layout).expect("Allocation 3 failed");
        assert_eq!(ptr3.cast::<u8>().as_ptr() as usize, addr1);

        allocator.deallocate(ptr3.cast(), layout);
    }
}

#[test]
fn test_stack_allocator_nested_markers() {
    let allocator =
        StackAllocator::with_config(4096, StackConfig::default()).expect("Failed to create stack");

    unsafe {
        let layout = Layout::from_size_align(32, 8).unwrap();

        let marker1 = allocator.mark();
        let _ptr1 = allocator.allocate(layout).expect("Allocation 1 failed");

        let marker2 = allocator.mark();
        let _ptr2 = allocator.allocate(layout).expect("Allocation 2 failed");

        let marker3 = allocator.mark();
        let _ptr3 = allocator.allocate(layout).expect("Allocation 3 failed");

        allocator
            .restore_to_marker(marker3)
            .expect("Inner restore failed");
        allocator
            .restore_to_marker(marker2)
            .expect("Middle restore failed");
        allocator
            .restore_to_marker(marker1)
            .expect("Outer restore failed");
    }

    assert_eq!(allocator.used(), 0);
}

#[test]
fn test_stack_allocator_stale_marker_rejected() {
    let allocator =
        StackAllocator::with_config(4096, StackConfig::default()).expect("Failed to create stack");

    unsafe {
        let layout = Layout::from_size_align(64, 8).unwrap();

        let _ptr = allocator.allocate(layout).expect("Allocation failed");
        let high_marker = allocator.mark();

        allocator.reset();

        // The saved position no longer exists.
        assert!(allocator.restore_to_marker(high_marker).is_err());
    }
}

#[test]
fn test_stack_allocator_exhaustion() {
    let allocator =
        StackAllocator::with_config(256, StackConfig::default()).expect("Failed to create stack");

    unsafe {
        let layout = Layout::from_size_align(200, 8).unwrap();
        let ptr = allocator.allocate(layout).expect("Allocation failed");

        let err = allocator.allocate(layout).unwrap_err();
        assert!(matches!(err, AllocError::StackExhausted { .. }));
        assert!(err.is_recoverable());

        allocator.deallocate(ptr.cast(), layout);
        let again = allocator.allocate(layout).expect("Allocation after free failed");
        allocator.deallocate(again.cast(), layout);
    }
}

#[test]
fn test_stack_allocator_alignment() {
    let allocator =
        StackAllocator::with_config(4096, StackConfig::default()).expect("Failed to create stack");

    unsafe {
        let layout_8 = Layout::from_size_align(64, 8).unwrap();
        let layout_16 = Layout::from_size_align(64, 16).unwrap();
        let layout_32 = Layout::from_size_align(64, 32).unwrap();

        let ptr_8 = allocator.allocate(layout_8).expect("8-byte alignment failed");
        let ptr_16 = allocator
            .allocate(layout_16)
            .expect("16-byte alignment failed");
        let ptr_32 = allocator
            .allocate(layout_32)
            .expect("32-byte alignment failed");

        assert_eq!(ptr_8.cast::<u8>().as_ptr() as usize % 8, 0);
        assert_eq!(ptr_16.cast::<u8>().as_ptr() as usize % 16, 0);
        assert_eq!(ptr_32.cast::<u8>().as_ptr() as usize % 32, 0);

        allocator.deallocate(ptr_32.cast(), layout_32);
        allocator.deallocate(ptr_16.cast(), layout_16);
        allocator.deallocate(ptr_8.cast(), layout_8);
    }
}

#[test]
fn test_stack_allocator_frame() {
    let allocator =
        StackAllocator::with_config(4096, StackConfig::default()).expect("Failed to create stack");

    unsafe {
        let layout = Layout::from_size_align(64, 8).unwrap();

        {
            let _frame = StackFrame::new(&allocator);
            let _ptr1 = allocator.allocate(layout).expect("Allocation 1 failed");
            let _ptr2 = allocator.allocate(layout).expect("Allocation 2 failed");
            assert!(allocator.used() >= 128);
        }

        // Frame drop rewound everything.
        assert_eq!(allocator.used(), 0);

        let ptr3 = allocator.allocate(layout).expect("Allocation 3 failed");
        allocator.deallocate(ptr3.cast(), layout);
    }
}

#[test]
fn test_stack_allocator_nested_frames() {
    let allocator =
        StackAllocator::with_config(4096, StackConfig::default()).expect("Failed to create stack");

    unsafe {
        let layout = Layout::from_size_align(32, 8).unwrap();

        {
            let _frame1 = StackFrame::new(&allocator);
            let _ptr1 = allocator.allocate(layout).expect("Allocation 1 failed");
            let after_outer = allocator.used();

            {
                let _frame2 = StackFrame::new(&allocator);
                let _ptr2 = allocator.allocate(layout).expect("Allocation 2 failed");
                assert!(allocator.used() > after_outer);
            }

            assert_eq!(allocator.used(), after_outer);
        }
    }

    assert_eq!(allocator.used(), 0);
}

#[test]
fn test_stack_allocator_memory_usage() {
    let allocator = StackAllocator::new(1024).expect("Failed to create stack");

    assert_eq!(allocator.capacity(), 1024);
    assert_eq!(allocator.used_memory(), 0);
    assert_eq!(allocator.available_memory(), Some(1024));

    unsafe {
        let layout = Layout::from_size_align(256, 8).unwrap();
        let ptr = allocator.allocate(layout).expect("Allocation failed");

        assert_eq!(allocator.used_memory(), 256);
        assert_eq!(allocator.available_memory(), Some(768));
        assert_eq!(allocator.total_memory(), Some(1024));

        allocator.deallocate(ptr.cast(), layout);
    }
}

#[test]
fn test_stack_allocator_stress_with_markers() {
    let allocator =
        StackAllocator::with_config(64 * 1024, StackConfig::default()).expect("Failed to create stack");

    unsafe {
        let layout = Layout::from_size_align(128, 8).unwrap();

        for _ in 0..100 {
            let marker = allocator.mark();

            for i in 0..10 {
                let ptr = allocator.allocate(layout).expect("Allocation failed");
                std::ptr::write_bytes(ptr.cast::<u8>().as_ptr(), i as u8, 128);
            }

            allocator
                .restore_to_marker(marker)
                .expect("Marker restore failed");
        }
    }

    assert_eq!(allocator.used(), 0);
}
