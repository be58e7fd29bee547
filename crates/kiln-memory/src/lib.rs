//! Specialized allocators for the Kiln runtime.
//!
//! A family of allocators behind one raw [`Allocator`] trait:
//!
//! - [`SystemAllocator`] forwards to the global heap and anchors the
//!   others as their default backing store.
//! - [`TrackedAllocator`] decorates any allocator with byte and call
//!   counters for leak detection at shutdown.
//! - [`PoolAllocator`] serves fixed-size blocks from a lock-free free
//!   list, with [`PoolBox`] as the RAII handle.
//! - [`StackAllocator`] bumps a cursor and rewinds it, either block by
//!   block in LIFO order or wholesale through [`StackMarker`] and
//!   [`StackFrame`].
//! - [`BuddyAllocator`] splits a power-of-two region into halves on
//!   demand and merges freed buddies back together.
//!
//! The [`TypedAllocator`] extension adds construct-on-allocate and
//! drop-on-deallocate on top of any of them.
//!
//! # Example
//!
//! ```
//! use kiln_memory::{PoolAllocator, PoolBox};
//!
//! let pool = PoolAllocator::for_type::<u64>(32)?;
//! let value = PoolBox::new_in(42u64, &pool)?;
//! assert_eq!(*value, 42);
//! # Ok::<(), kiln_memory::AllocError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

extern crate alloc;

pub mod allocator;
pub mod core;
pub mod error;
pub mod utils;

#[cfg(feature = "std")]
pub use allocator::{BuddyAllocator, BuddyConfig};
pub use allocator::{
    Allocator, AllocatorStats, AtomicAllocatorStats, OptionalStats, PoolAllocator, PoolBox,
    PoolConfig, PoolStats, StackAllocator, StackConfig, StackFrame, StackMarker, SystemAllocator,
    ThreadSafeAllocator, TrackExt, TrackedAllocator, TypedAllocator,
};
pub use error::{AllocError, AllocErrorCode, AllocResult};
pub use self::core::{BasicMemoryUsage, MemoryUsage, Resettable, StatisticsProvider};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
