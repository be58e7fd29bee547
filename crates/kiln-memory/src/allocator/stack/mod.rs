//! Stack (linear) allocator
//!
//! Allocation bumps a cursor through one contiguous region; deallocation
//! rewinds it. Callers either free in reverse allocation order or rewind
//! wholesale with [`StackMarker`] / [`StackFrame`]. Everything allocated
//! after a marker dies together when the marker is restored, which suits
//! per-frame and per-phase scratch data.

mod allocator;
mod config;
mod frame;
mod marker;

pub use allocator::StackAllocator;
pub use config::StackConfig;
pub use frame::StackFrame;
pub use marker::StackMarker;
