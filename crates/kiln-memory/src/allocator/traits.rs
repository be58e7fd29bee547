//! Allocator trait hierarchy
//!
//! The raw [`Allocator`] trait speaks `Layout` and `NonNull<[u8]>` and
//! carries the usual narrow contract: a pointer passed to `deallocate`
//! must come from the same allocator with the same layout. The blanket
//! [`TypedAllocator`] layer builds the typed construct-on-allocate /
//! destruct-on-deallocate surface on top of it.

use core::alloc::Layout;
use core::mem::MaybeUninit;
use core::ptr::{self, NonNull};

use crate::error::{AllocError, AllocResult};

/// Raw allocation interface.
///
/// # Safety
/// Implementations must return memory that is valid for reads and writes
/// of `layout.size()` bytes at `layout.align()` alignment, and must not
/// hand out overlapping regions for live allocations.
pub unsafe trait Allocator {
    /// Allocates a block described by `layout`.
    ///
    /// # Safety
    /// `layout` must have non-zero size unless
    /// [`supports_zero_sized_allocs`](Allocator::supports_zero_sized_allocs)
    /// returns `true`.
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>>;

    /// Deallocates a block previously returned by [`allocate`](Allocator::allocate).
    ///
    /// # Safety
    /// - `ptr` must come from this allocator with the same `layout`
    /// - `ptr` must not be used after this call
    /// - each allocation is deallocated at most once
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Allocates a zero-initialized block.
    ///
    /// # Safety
    /// Same contract as [`allocate`](Allocator::allocate).
    unsafe fn allocate_zeroed(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        // SAFETY: same contract as allocate; the returned block is valid
        // for layout.size() writes.
        unsafe {
            let ptr = self.allocate(layout)?;
            ptr::write_bytes(ptr.cast::<u8>().as_ptr(), 0, layout.size());
            Ok(ptr)
        }
    }

    /// Largest single allocation this allocator can serve.
    fn max_allocation_size(&self) -> usize {
        isize::MAX as usize
    }

    /// Whether zero-sized layouts are accepted.
    fn supports_zero_sized_allocs(&self) -> bool {
        false
    }
}

// SAFETY: forwarding preserves the implementation's guarantees.
unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        // SAFETY: caller upholds the allocate contract.
        unsafe { (**self).allocate(layout) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: caller upholds the deallocate contract.
        unsafe { (**self).deallocate(ptr, layout) }
    }

    fn max_allocation_size(&self) -> usize {
        (**self).max_allocation_size()
    }

    fn supports_zero_sized_allocs(&self) -> bool {
        (**self).supports_zero_sized_allocs()
    }
}

/// Marker for allocators that are sound to share across threads.
///
/// # Safety
/// Implementations must keep every trait method linearizable when called
/// from multiple threads on the same instance.
pub unsafe trait ThreadSafeAllocator: Allocator + Send + Sync {}

// SAFETY: a shared reference to a thread-safe allocator is itself
// thread-safe.
unsafe impl<A: ThreadSafeAllocator> ThreadSafeAllocator for &A {}

/// Typed allocation layer.
///
/// Values are constructed into allocator memory on allocation and dropped
/// in place on deallocation, exactly once each.
pub trait TypedAllocator: Allocator {
    /// Allocates storage for one `T` without initializing it.
    fn alloc_uninit<T>(&self) -> AllocResult<NonNull<MaybeUninit<T>>> {
        let layout = Layout::new::<T>();
        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { self.allocate(layout)? };
        Ok(ptr.cast())
    }

    /// Allocates storage for one `T` and moves `value` into it.
    fn alloc_value<T>(&self, value: T) -> AllocResult<NonNull<T>> {
        let ptr = self.alloc_uninit::<T>()?;
        // SAFETY: ptr is valid for one T (or dangling for a ZST, where the
        // write is a no-op move).
        unsafe {
            ptr.as_ptr().write(MaybeUninit::new(value));
        }
        Ok(ptr.cast())
    }

    /// Allocates and default-constructs `count` values of `T`.
    fn alloc_array<T: Default>(&self, count: usize) -> AllocResult<NonNull<T>> {
        self.alloc_array_with(count, |_| T::default())
    }

    /// Allocates `count` values of `T`, initializing each from `init`.
    fn alloc_array_with<T>(
        &self,
        count: usize,
        mut init: impl FnMut(usize) -> T,
    ) -> AllocResult<NonNull<T>> {
        let layout =
            Layout::array::<T>(count).map_err(|_| AllocError::size_overflow("array layout"))?;
        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }
        // SAFETY: layout has non-zero size; the block is valid for `count`
        // consecutive T writes.
        unsafe {
            let raw = self.allocate(layout)?.cast::<T>();
            for i in 0..count {
                raw.as_ptr().add(i).write(init(i));
            }
            Ok(raw)
        }
    }

    /// Drops the value and releases its storage.
    ///
    /// # Safety
    /// `ptr` must come from [`alloc_value`](TypedAllocator::alloc_value)
    /// (or an initialized [`alloc_uninit`](TypedAllocator::alloc_uninit))
    /// on this allocator, and must not be used afterwards.
    unsafe fn dealloc_value<T>(&self, ptr: NonNull<T>) {
        let layout = Layout::new::<T>();
        // SAFETY: ptr points to a live T per the contract.
        unsafe {
            ptr::drop_in_place(ptr.as_ptr());
            if layout.size() != 0 {
                self.deallocate(ptr.cast(), layout);
            }
        }
    }

    /// Drops `count` values and releases their storage.
    ///
    /// # Safety
    /// `ptr` and `count` must match a previous
    /// [`alloc_array`](TypedAllocator::alloc_array) /
    /// [`alloc_array_with`](TypedAllocator::alloc_array_with) call on this
    /// allocator, and the array must not be used afterwards.
    unsafe fn dealloc_array<T>(&self, ptr: NonNull<T>, count: usize) {
        // SAFETY: the array holds `count` live values per the contract.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(ptr.as_ptr(), count));
        }
        let Ok(layout) = Layout::array::<T>(count) else {
            debug_assert!(false, "dealloc_array count does not match an allocation");
            return;
        };
        if layout.size() != 0 {
            // SAFETY: same allocator, same layout as the allocation.
            unsafe { self.deallocate(ptr.cast(), layout) };
        }
    }
}

impl<A: Allocator + ?Sized> TypedAllocator for A {}

/// Rejects layouts an allocator cannot serve.
pub(crate) fn validate_layout(
    layout: Layout,
    max_size: usize,
    supports_zst: bool,
) -> AllocResult<()> {
    if layout.size() == 0 && !supports_zst {
        return Err(AllocError::invalid_layout("zero-sized allocation"));
    }
    if layout.size() > max_size {
        return Err(AllocError::invalid_layout("size exceeds allocator maximum"));
    }
    Ok(())
}
