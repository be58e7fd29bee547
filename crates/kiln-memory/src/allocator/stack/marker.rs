//! Stack position markers

/// Saved cursor position inside a [`StackAllocator`](super::StackAllocator).
///
/// Restoring a marker frees everything allocated after it was taken. A
/// marker is only meaningful for the allocator it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StackMarker {
    pub(super) offset: usize,
}

impl StackMarker {
    /// Byte offset from the start of the stack region.
    pub const fn offset(self) -> usize {
        self.offset
    }
}
