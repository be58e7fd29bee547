//! Scoped stack regions

use super::{StackAllocator, StackMarker};

/// Scope guard that rewinds a [`StackAllocator`] on drop.
///
/// Everything allocated while the frame is alive is freed together when
/// the frame ends, whether by falling out of scope or by an early return.
#[derive(Debug)]
pub struct StackFrame<'a> {
    allocator: &'a StackAllocator,
    marker: StackMarker,
}

impl<'a> StackFrame<'a> {
    /// Opens a frame at the allocator's current position.
    pub fn new(allocator: &'a StackAllocator) -> Self {
        Self {
            allocator,
            marker: allocator.mark(),
        }
    }

    /// The allocator this frame scopes.
    pub const fn allocator(&self) -> &'a StackAllocator {
        self.allocator
    }

    /// The position the frame will rewind to.
    pub const fn marker(&self) -> StackMarker {
        self.marker
    }
}

impl Drop for StackFrame<'_> {
    fn drop(&mut self) {
        // SAFETY: the frame's lifetime bounds every pointer allocated
        // inside it; rewinding here cannot invalidate anything still
        // usable. A stale marker means an outer restore already freed
        // this range, so the failure is ignored.
        let _ = unsafe { self.allocator.restore_to_marker(self.marker) };
    }
}
