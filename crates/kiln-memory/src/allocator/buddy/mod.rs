//! Buddy allocator
//!
//! Serves power-of-two blocks out of one power-of-two region. Each block
//! splits into two half-size buddies on demand; freed buddies merge back
//! into their parent as soon as both halves are free, which keeps
//! fragmentation bounded for mixed-size workloads.

mod allocator;
mod config;
mod tree;

pub use allocator::BuddyAllocator;
pub use config::BuddyConfig;
