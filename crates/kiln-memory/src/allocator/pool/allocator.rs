//! Pool allocator core

use core::alloc::Layout;
use core::mem;
use core::ptr::{self, NonNull};
use core::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use crate::allocator::stats::OptionalStats;
use crate::allocator::traits::{Allocator, ThreadSafeAllocator};
use crate::allocator::{validate_layout, SystemAllocator};
use crate::core::{MemoryUsage, Resettable, StatisticsProvider};
use crate::error::{AllocError, AllocResult};
use crate::utils::{align_up, is_power_of_two, Backoff};

use super::{PoolConfig, PoolStats};

/// Free list node stored inside each unused block.
#[repr(C)]
struct FreeBlock {
    next: *mut FreeBlock,
}

/// Fixed-size block allocator over one contiguous region.
///
/// Every block has the same size and alignment, so allocation is a
/// lock-free pop from an intrusive free list and deallocation a push.
/// The region itself comes from the backing allocator `A` and is
/// returned to it on drop.
pub struct PoolAllocator<A: Allocator = SystemAllocator> {
    backing: A,
    region: NonNull<u8>,
    region_layout: Layout,
    block_size: usize,
    block_align: usize,
    stride: usize,
    block_count: usize,
    free_head: AtomicPtr<FreeBlock>,
    free_count: AtomicUsize,
    stats: OptionalStats,
    config: PoolConfig,
}

impl PoolAllocator<SystemAllocator> {
    /// Pool of `block_count` blocks of `block_size` bytes at `block_align`,
    /// backed by the system heap.
    pub fn new(block_size: usize, block_align: usize, block_count: usize) -> AllocResult<Self> {
        Self::with_config(block_size, block_align, block_count, PoolConfig::default())
    }

    /// Same as [`new`](Self::new) with an explicit configuration.
    pub fn with_config(
        block_size: usize,
        block_align: usize,
        block_count: usize,
        config: PoolConfig,
    ) -> AllocResult<Self> {
        Self::with_backing(SystemAllocator::new(), block_size, block_align, block_count, config)
    }

    /// Pool sized and aligned for `count` values of `T`.
    pub fn for_type<T>(count: usize) -> AllocResult<Self> {
        Self::new(mem::size_of::<T>().max(1), mem::align_of::<T>(), count)
    }
}

impl<A: Allocator> PoolAllocator<A> {
    /// Pool whose region is obtained from `backing`.
    pub fn with_backing(
        backing: A,
        block_size: usize,
        block_align: usize,
        block_count: usize,
        config: PoolConfig,
    ) -> AllocResult<Self> {
        if block_size == 0 {
            return Err(AllocError::invalid_layout("pool block size must be non-zero"));
        }
        if block_count == 0 {
            return Err(AllocError::invalid_layout("pool must hold at least one block"));
        }
        if !is_power_of_two(block_align) {
            return Err(AllocError::invalid_alignment(block_align));
        }

        // Each block must be able to hold a free list node while unused.
        let effective_align = block_align.max(mem::align_of::<FreeBlock>());
        let stride = align_up(
            block_size.max(mem::size_of::<FreeBlock>()),
            effective_align,
        );
        let total = stride
            .checked_mul(block_count)
            .ok_or(AllocError::size_overflow("pool region size"))?;
        let region_layout = Layout::from_size_align(total, effective_align)
            .map_err(|_| AllocError::invalid_layout("pool region layout"))?;

        // SAFETY: region_layout has non-zero size.
        let region = unsafe { backing.allocate(region_layout)? }.cast::<u8>();
        let head = link_blocks(region, stride, block_count);

        #[cfg(feature = "logging")]
        tracing::debug!(
            block_size,
            block_count,
            stride,
            total_bytes = total,
            "pool allocator created"
        );

        Ok(Self {
            backing,
            region,
            region_layout,
            block_size,
            block_align: effective_align,
            stride,
            block_count,
            free_head: AtomicPtr::new(head),
            free_count: AtomicUsize::new(block_count),
            stats: OptionalStats::new(config.track_stats),
            config,
        })
    }

    /// Usable bytes per block.
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Guaranteed alignment of every block.
    pub const fn block_align(&self) -> usize {
        self.block_align
    }

    /// Total number of blocks.
    pub const fn block_count(&self) -> usize {
        self.block_count
    }

    /// Blocks currently on the free list.
    pub fn free_blocks(&self) -> usize {
        self.free_count.load(Ordering::Relaxed)
    }

    /// Blocks currently handed out.
    pub fn used_blocks(&self) -> usize {
        self.block_count - self.free_blocks()
    }

    /// Whether no block is currently available.
    pub fn is_exhausted(&self) -> bool {
        self.free_blocks() == 0
    }

    /// Whether `ptr` points into this pool's region.
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        let start = self.region.as_ptr() as usize;
        addr >= start && addr < start + self.region_layout.size()
    }

    /// Active configuration.
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Usage snapshot combining pool geometry with recorded counters.
    pub fn stats(&self) -> PoolStats {
        let snap = self.stats.snapshot();
        let free = self.free_blocks();
        PoolStats {
            block_size: self.block_size,
            block_stride: self.stride,
            block_count: self.block_count,
            free_blocks: free,
            used_blocks: self.block_count - free,
            total_allocs: snap.allocation_count,
            total_deallocs: snap.deallocation_count,
            peak_used_blocks: snap.peak_allocated_bytes / self.block_size,
        }
    }

    fn pop_block(&self) -> AllocResult<NonNull<u8>> {
        let mut backoff = Backoff::new();
        let mut attempts = 0usize;
        loop {
            let head = self.free_head.load(Ordering::Acquire);
            let Some(block) = NonNull::new(head) else {
                self.stats.record_failure();
                return Err(AllocError::pool_exhausted(self.block_count));
            };
            // SAFETY: a non-null head is always a linked free block inside
            // the region.
            let next = unsafe { (*head).next };
            match self
                .free_head
                .compare_exchange_weak(head, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    self.free_count.fetch_sub(1, Ordering::Relaxed);
                    return Ok(block.cast());
                }
                Err(_) => {
                    attempts += 1;
                    if attempts >= self.config.max_retries {
                        self.stats.record_failure();
                        return Err(AllocError::invalid_state(
                            "pool free list contention exceeded retry limit",
                        ));
                    }
                    if self.config.use_backoff {
                        backoff.spin();
                    }
                }
            }
        }
    }

    fn push_block(&self, block: NonNull<u8>) {
        let node = block.as_ptr().cast::<FreeBlock>();
        let mut backoff = Backoff::new();
        loop {
            let head = self.free_head.load(Ordering::Acquire);
            // SAFETY: node points at a block-sized, FreeBlock-aligned slot
            // that is no longer in use.
            unsafe { (*node).next = head };
            if self
                .free_head
                .compare_exchange_weak(head, node, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
            if self.config.use_backoff {
                backoff.spin();
            }
        }
        self.free_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Threads the free list through the blocks, head at the lowest address.
fn link_blocks(region: NonNull<u8>, stride: usize, count: usize) -> *mut FreeBlock {
    let mut head: *mut FreeBlock = ptr::null_mut();
    for i in (0..count).rev() {
        // SAFETY: i * stride stays inside the stride * count region, and
        // every slot is aligned and large enough for a FreeBlock.
        let block = unsafe { region.as_ptr().add(i * stride) }.cast::<FreeBlock>();
        // SAFETY: block is valid for a FreeBlock write.
        unsafe { (*block).next = head };
        head = block;
    }
    head
}

// SAFETY: blocks are validated to fit the fixed layout, handed out at most
// once at a time, and never overlap.
unsafe impl<A: Allocator> Allocator for PoolAllocator<A> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        validate_layout(layout, self.block_size, false)?;
        if layout.align() > self.block_align {
            self.stats.record_failure();
            return Err(AllocError::invalid_alignment(layout.align()));
        }

        let block = self.pop_block()?;
        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: the block spans block_size writable bytes.
            unsafe { ptr::write_bytes(block.as_ptr(), pattern, self.block_size) };
        }
        self.stats.record_allocation(self.block_size);
        Ok(NonNull::slice_from_raw_parts(block, self.block_size))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
        debug_assert!(self.contains(ptr), "pointer does not belong to this pool");
        debug_assert!(
            (ptr.as_ptr() as usize - self.region.as_ptr() as usize) % self.stride == 0,
            "pointer does not point at a block boundary"
        );

        if let Some(pattern) = self.config.dealloc_pattern {
            // SAFETY: the block spans block_size writable bytes and is no
            // longer in use.
            unsafe { ptr::write_bytes(ptr.as_ptr(), pattern, self.block_size) };
        }
        self.push_block(ptr);
        self.stats.record_deallocation(self.block_size);
    }

    fn max_allocation_size(&self) -> usize {
        self.block_size
    }
}

// SAFETY: the region pointer is owned; sharing the pool across threads is
// sound as long as the backing allocator can move or be shared too.
unsafe impl<A: Allocator + Send> Send for PoolAllocator<A> {}
// SAFETY: all shared state is behind atomics.
unsafe impl<A: Allocator + Sync> Sync for PoolAllocator<A> {}
// SAFETY: allocate and deallocate are single CAS loops over the free list.
unsafe impl<A: Allocator + Send + Sync> ThreadSafeAllocator for PoolAllocator<A> {}

impl<A: Allocator> MemoryUsage for PoolAllocator<A> {
    fn used_memory(&self) -> usize {
        self.used_blocks() * self.stride
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.free_blocks() * self.stride)
    }
}

impl<A: Allocator> StatisticsProvider for PoolAllocator<A> {
    fn statistics(&self) -> crate::allocator::AllocatorStats {
        self.stats.snapshot()
    }

    fn reset_statistics(&self) {
        self.stats.reset();
    }

    fn statistics_enabled(&self) -> bool {
        self.stats.is_enabled()
    }
}

impl<A: Allocator> Resettable for PoolAllocator<A> {
    unsafe fn reset(&self) {
        let head = link_blocks(self.region, self.stride, self.block_count);
        self.free_head.store(head, Ordering::Release);
        self.free_count.store(self.block_count, Ordering::Relaxed);
        self.stats.reset();
    }
}

impl<A: Allocator> Drop for PoolAllocator<A> {
    fn drop(&mut self) {
        // SAFETY: the region was allocated from the backing allocator with
        // region_layout and is not referenced after drop.
        unsafe { self.backing.deallocate(self.region, self.region_layout) };
    }
}

impl<A: Allocator> core::fmt::Debug for PoolAllocator<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("block_size", &self.block_size)
            .field("block_align", &self.block_align)
            .field("stride", &self.stride)
            .field("block_count", &self.block_count)
            .field("free_blocks", &self.free_blocks())
            .finish_non_exhaustive()
    }
}
