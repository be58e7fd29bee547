//! Allocator implementations
//!
//! The raw [`Allocator`] trait plus the concrete allocators built on it:
//! the system heap wrapper, the tracking decorator, and the pool, stack
//! and buddy region allocators.

mod stats;
mod system;
mod tracked;
mod traits;

#[cfg(feature = "std")]
pub mod buddy;
pub mod pool;
pub mod stack;

#[cfg(feature = "std")]
pub use buddy::{BuddyAllocator, BuddyConfig};
pub use pool::{PoolAllocator, PoolBox, PoolConfig, PoolStats};
pub use stack::{StackAllocator, StackConfig, StackFrame, StackMarker};
pub use stats::{AllocatorStats, AtomicAllocatorStats, OptionalStats};
pub use system::SystemAllocator;
pub use tracked::{TrackExt, TrackedAllocator};
pub use traits::{Allocator, ThreadSafeAllocator, TypedAllocator};

pub(crate) use traits::validate_layout;
