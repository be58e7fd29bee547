//! Buddy allocator core

use core::alloc::Layout;
use core::ptr::{self, NonNull};

use parking_lot::Mutex;

use crate::allocator::stats::OptionalStats;
use crate::allocator::traits::{Allocator, ThreadSafeAllocator};
use crate::allocator::{validate_layout, SystemAllocator};
use crate::core::{MemoryUsage, Resettable, StatisticsProvider};
use crate::error::{AllocError, AllocResult};
use crate::utils::{is_power_of_two, log2_pow2, next_power_of_two};

use super::tree;
use super::BuddyConfig;

/// Regions larger than this are aligned to a page rather than their own
/// size.
const MAX_REGION_ALIGN: usize = 4096;

/// Deepest tree the allocator will build; bounds node storage.
const MAX_LEVELS: u32 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Free,
    Split,
    Allocated,
}

/// Split/allocation state of every block, kept apart from the region so
/// freed memory can be pattern-filled without touching metadata.
struct BuddyTree {
    nodes: Vec<NodeState>,
    total_size: usize,
    free_bytes: usize,
}

impl BuddyTree {
    fn new(total_size: usize, levels: u32) -> Self {
        Self {
            nodes: vec![NodeState::Free; tree::node_count(levels)],
            total_size,
            free_bytes: total_size,
        }
    }

    /// Claims the leftmost free node on `target` level, splitting parents
    /// on the way down. Ancestors of the claimed node become `Split`.
    fn reserve(&mut self, target: u32) -> Option<usize> {
        let index = self.find_free(0, 0, target)?;
        self.nodes[index] = NodeState::Allocated;
        let mut i = index;
        while i > 0 {
            i = tree::parent(i);
            self.nodes[i] = NodeState::Split;
        }
        self.free_bytes -= tree::block_size_at(self.total_size, target);
        Some(index)
    }

    // A node is Free only when its whole subtree is free, so descending
    // through a Free node always finds Free children.
    fn find_free(&self, index: usize, level: u32, target: u32) -> Option<usize> {
        match self.nodes[index] {
            NodeState::Allocated => None,
            NodeState::Free if level == target => Some(index),
            NodeState::Split if level == target => None,
            NodeState::Free | NodeState::Split => self
                .find_free(tree::left_child(index), level + 1, target)
                .or_else(|| self.find_free(tree::right_child(index), level + 1, target)),
        }
    }

    /// Frees the allocated node at `offset`, recovering its size from the
    /// tree, then merges buddies upward as far as possible.
    ///
    /// Returns the freed block size, or `None` when no allocated node
    /// covers `offset`.
    fn release(&mut self, offset: usize) -> Option<usize> {
        let mut index = 0;
        let mut level = 0u32;
        let mut node_offset = 0;
        loop {
            match self.nodes[index] {
                NodeState::Allocated => break,
                NodeState::Split => {
                    let child_size = tree::block_size_at(self.total_size, level + 1);
                    if offset < node_offset + child_size {
                        index = tree::left_child(index);
                    } else {
                        node_offset += child_size;
                        index = tree::right_child(index);
                    }
                    level += 1;
                }
                NodeState::Free => {
                    debug_assert!(false, "no allocated block covers this pointer");
                    return None;
                }
            }
        }
        debug_assert_eq!(node_offset, offset, "pointer is not a block boundary");

        let size = tree::block_size_at(self.total_size, level);
        self.nodes[index] = NodeState::Free;
        self.free_bytes += size;

        let mut i = index;
        while i > 0 && self.nodes[tree::buddy_of(i)] == NodeState::Free {
            let p = tree::parent(i);
            self.nodes[p] = NodeState::Free;
            i = p;
        }
        Some(size)
    }

    fn reset(&mut self) {
        self.nodes.fill(NodeState::Free);
        self.free_bytes = self.total_size;
    }
}

/// Power-of-two block allocator with buddy splitting and merging.
///
/// The region size must be a power of two. Requests round up to the next
/// power of two no smaller than the configured minimum block size; freeing
/// a block merges it with its buddy whenever both halves are free, so a
/// fully freed allocator always ends up with one undivided region.
pub struct BuddyAllocator<A: Allocator = SystemAllocator> {
    backing: A,
    region: NonNull<u8>,
    region_layout: Layout,
    total_size: usize,
    min_block_size: usize,
    region_align: usize,
    tree: Mutex<BuddyTree>,
    stats: OptionalStats,
    config: BuddyConfig,
}

impl BuddyAllocator<SystemAllocator> {
    /// Buddy allocator over a fresh region of `total_size` bytes.
    pub fn new(total_size: usize) -> AllocResult<Self> {
        Self::with_config(total_size, BuddyConfig::default())
    }

    /// Same as [`new`](Self::new) with an explicit configuration.
    pub fn with_config(total_size: usize, config: BuddyConfig) -> AllocResult<Self> {
        Self::with_backing(SystemAllocator::new(), total_size, config)
    }
}

impl<A: Allocator> BuddyAllocator<A> {
    /// Buddy allocator whose region is obtained from `backing`.
    pub fn with_backing(backing: A, total_size: usize, config: BuddyConfig) -> AllocResult<Self> {
        if !is_power_of_two(total_size) {
            return Err(AllocError::invalid_layout(
                "buddy region size must be a power of two",
            ));
        }
        if total_size > isize::MAX as usize {
            return Err(AllocError::size_overflow("buddy region size"));
        }
        if !is_power_of_two(config.min_block_size) {
            return Err(AllocError::invalid_layout(
                "minimum block size must be a power of two",
            ));
        }
        if config.min_block_size > total_size {
            return Err(AllocError::invalid_layout(
                "minimum block size exceeds the region",
            ));
        }

        let levels = log2_pow2(total_size / config.min_block_size) + 1;
        if levels > MAX_LEVELS {
            return Err(AllocError::invalid_layout(
                "region to minimum block ratio is too large",
            ));
        }

        let region_align = total_size.min(MAX_REGION_ALIGN);
        let region_layout = Layout::from_size_align(total_size, region_align)
            .map_err(|_| AllocError::invalid_layout("buddy region layout"))?;
        // SAFETY: region_layout has non-zero size.
        let region = unsafe { backing.allocate(region_layout)? }.cast::<u8>();

        #[cfg(feature = "logging")]
        tracing::debug!(
            total_size,
            min_block_size = config.min_block_size,
            levels,
            "buddy allocator created"
        );

        Ok(Self {
            backing,
            region,
            region_layout,
            total_size,
            min_block_size: config.min_block_size,
            region_align,
            tree: Mutex::new(BuddyTree::new(total_size, levels)),
            stats: OptionalStats::new(config.track_stats),
            config,
        })
    }

    /// Region size in bytes.
    pub const fn total_size(&self) -> usize {
        self.total_size
    }

    /// Smallest block the tree splits down to.
    pub const fn min_block_size(&self) -> usize {
        self.min_block_size
    }

    /// Bytes not currently allocated.
    ///
    /// Counts every free block, so a single allocation of this many bytes
    /// can still fail on fragmentation.
    pub fn free_size(&self) -> usize {
        self.tree.lock().free_bytes
    }

    /// Bytes currently allocated, including rounding to block sizes.
    pub fn used_size(&self) -> usize {
        self.total_size - self.free_size()
    }

    /// Active configuration.
    pub const fn config(&self) -> &BuddyConfig {
        &self.config
    }

    /// Whether `ptr` points into this allocator's region.
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        let start = self.region.as_ptr() as usize;
        addr >= start && addr < start + self.total_size
    }

    /// Block size a request for `size` bytes rounds up to.
    pub fn size_class(&self, size: usize) -> usize {
        next_power_of_two(size).max(self.min_block_size)
    }
}

// SAFETY: the tree hands out each block at most once; blocks on different
// tree nodes never overlap while allocated.
unsafe impl<A: Allocator> Allocator for BuddyAllocator<A> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        validate_layout(layout, self.total_size, false)?;
        if layout.align() > self.region_align {
            self.stats.record_failure();
            return Err(AllocError::invalid_alignment(layout.align()));
        }

        let class = self.size_class(layout.size().max(layout.align()));
        let target_level = log2_pow2(self.total_size / class);

        let offset = {
            let mut tree = self.tree.lock();
            match tree.reserve(target_level) {
                Some(index) => tree::offset_of(index, target_level, self.total_size),
                None => {
                    drop(tree);
                    self.stats.record_failure();
                    return Err(AllocError::fragmentation_exhausted(class));
                }
            }
        };

        // SAFETY: offset + class <= total_size, so the block is inside the
        // region.
        let block = unsafe { self.region.as_ptr().add(offset) };
        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: the block spans class writable bytes.
            unsafe { ptr::write_bytes(block, pattern, class) };
        }
        self.stats.record_allocation(class);
        // SAFETY: block points into a live region, never null.
        let block = unsafe { NonNull::new_unchecked(block) };
        Ok(NonNull::slice_from_raw_parts(block, class))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
        debug_assert!(self.contains(ptr), "pointer does not belong to this region");
        let offset = ptr.as_ptr() as usize - self.region.as_ptr() as usize;

        let released = self.tree.lock().release(offset);
        if let Some(size) = released {
            if let Some(pattern) = self.config.dealloc_pattern {
                // SAFETY: the freed block spans size writable bytes.
                unsafe { ptr::write_bytes(ptr.as_ptr(), pattern, size) };
            }
            self.stats.record_deallocation(size);
        }
    }

    fn max_allocation_size(&self) -> usize {
        self.total_size
    }
}

// SAFETY: the region pointer is owned for the allocator's lifetime.
unsafe impl<A: Allocator + Send> Send for BuddyAllocator<A> {}
// SAFETY: the tree is behind a mutex and the counters are atomic.
unsafe impl<A: Allocator + Sync> Sync for BuddyAllocator<A> {}
// SAFETY: every tree operation happens under the mutex.
unsafe impl<A: Allocator + Send + Sync> ThreadSafeAllocator for BuddyAllocator<A> {}

impl<A: Allocator> MemoryUsage for BuddyAllocator<A> {
    fn used_memory(&self) -> usize {
        self.used_size()
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.free_size())
    }
}

impl<A: Allocator> StatisticsProvider for BuddyAllocator<A> {
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

impl<A: Allocator> Resettable for BuddyAllocator<A> {
    unsafe fn reset(&self) {
        self.tree.lock().reset();
        self.stats.reset();
    }
}

impl<A: Allocator> Drop for BuddyAllocator<A> {
    fn drop(&mut self) {
        // SAFETY: the region was allocated from the backing allocator with
        // region_layout and is not referenced after drop.
        unsafe { self.backing.deallocate(self.region, self.region_layout) };
    }
}

impl<A: Allocator> core::fmt::Debug for BuddyAllocator<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BuddyAllocator")
            .field("total_size", &self.total_size)
            .field("min_block_size", &self.min_block_size)
            .field("free_size", &self.free_size())
            .finish_non_exhaustive()
    }
}
