//! Allocation error types
//!
//! Every fallible operation in this crate reports failure through
//! [`AllocError`]. Exhaustion conditions (a full pool, a spent stack, no
//! free buddy block of the requested class) are recoverable and carry
//! enough context for the caller to decide what to do next; they are never
//! fatal inside an allocator.

use thiserror::Error;

/// Result alias used throughout the crate
pub type AllocResult<T> = Result<T, AllocError>;

/// Machine-readable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocErrorCode {
    /// The backing system allocator returned null
    OutOfMemory,
    /// Arithmetic on sizes or counts overflowed
    SizeOverflow,
    /// Alignment is zero, not a power of two, or unsupported
    InvalidAlignment,
    /// Layout is not acceptable to this allocator
    InvalidLayout,
    /// The allocator is in a state that forbids the operation
    InvalidState,
    /// Every block in the pool is live
    PoolExhausted,
    /// The stack region has no room for the request
    StackExhausted,
    /// No free node of the requested size class exists
    FragmentationExhausted,
}

impl AllocErrorCode {
    /// Stable identifier for logs and telemetry
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OutOfMemory => "ALLOC_OUT_OF_MEMORY",
            Self::SizeOverflow => "ALLOC_SIZE_OVERFLOW",
            Self::InvalidAlignment => "ALLOC_INVALID_ALIGNMENT",
            Self::InvalidLayout => "ALLOC_INVALID_LAYOUT",
            Self::InvalidState => "ALLOC_INVALID_STATE",
            Self::PoolExhausted => "ALLOC_POOL_EXHAUSTED",
            Self::StackExhausted => "ALLOC_STACK_EXHAUSTED",
            Self::FragmentationExhausted => "ALLOC_FRAGMENTATION_EXHAUSTED",
        }
    }

    /// Whether the caller can reasonably retry after freeing memory
    pub const fn is_recoverable(self) -> bool {
        matches!(
            self,
            Self::OutOfMemory
                | Self::PoolExhausted
                | Self::StackExhausted
                | Self::FragmentationExhausted
        )
    }
}

/// Error returned by allocator operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The underlying system allocation failed
    #[error("allocation of {size} bytes (align {align}) failed")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
        /// Requested alignment in bytes
        align: usize,
    },

    /// Size arithmetic overflowed
    #[error("size overflow while computing {what}")]
    SizeOverflow {
        /// Short description of the computation
        what: &'static str,
    },

    /// Alignment is zero, not a power of two, or larger than supported
    #[error("invalid alignment {align}")]
    InvalidAlignment {
        /// Offending alignment
        align: usize,
    },

    /// The layout cannot be served by this allocator
    #[error("invalid layout: {reason}")]
    InvalidLayout {
        /// Why the layout was rejected
        reason: &'static str,
    },

    /// The operation is not valid in the current state
    #[error("invalid state: {reason}")]
    InvalidState {
        /// Why the operation was rejected
        reason: &'static str,
    },

    /// All blocks in the pool are currently live
    #[error("pool exhausted: all {block_count} blocks are live")]
    PoolExhausted {
        /// Capacity of the pool in blocks
        block_count: usize,
    },

    /// The stack region cannot satisfy the request
    #[error("stack exhausted: requested {requested} bytes, {available} available")]
    StackExhausted {
        /// Bytes requested (after alignment)
        requested: usize,
        /// Bytes remaining above the cursor
        available: usize,
    },

    /// No free node of the requested size class
    #[error("no free block of size class {size_class}")]
    FragmentationExhausted {
        /// Power-of-two class the request was rounded to
        size_class: usize,
    },
}

impl AllocError {
    /// System allocation returned null.
    pub const fn allocation_failed(size: usize, align: usize) -> Self {
        Self::OutOfMemory { size, align }
    }

    /// Size arithmetic overflowed.
    pub const fn size_overflow(what: &'static str) -> Self {
        Self::SizeOverflow { what }
    }

    /// Alignment was rejected.
    pub const fn invalid_alignment(align: usize) -> Self {
        Self::InvalidAlignment { align }
    }

    /// Layout was rejected.
    pub const fn invalid_layout(reason: &'static str) -> Self {
        Self::InvalidLayout { reason }
    }

    /// Operation not valid in the current state.
    pub const fn invalid_state(reason: &'static str) -> Self {
        Self::InvalidState { reason }
    }

    /// Pool has no free blocks.
    pub const fn pool_exhausted(block_count: usize) -> Self {
        Self::PoolExhausted { block_count }
    }

    /// Stack region cannot satisfy the request.
    pub const fn stack_exhausted(requested: usize, available: usize) -> Self {
        Self::StackExhausted {
            requested,
            available,
        }
    }

    /// No free buddy node of the requested class.
    pub const fn fragmentation_exhausted(size_class: usize) -> Self {
        Self::FragmentationExhausted { size_class }
    }

    /// Category of this error
    pub const fn code(&self) -> AllocErrorCode {
        match self {
            Self::OutOfMemory { .. } => AllocErrorCode::OutOfMemory,
            Self::SizeOverflow { .. } => AllocErrorCode::SizeOverflow,
            Self::InvalidAlignment { .. } => AllocErrorCode::InvalidAlignment,
            Self::InvalidLayout { .. } => AllocErrorCode::InvalidLayout,
            Self::InvalidState { .. } => AllocErrorCode::InvalidState,
            Self::PoolExhausted { .. } => AllocErrorCode::PoolExhausted,
            Self::StackExhausted { .. } => AllocErrorCode::StackExhausted,
            Self::FragmentationExhausted { .. } => AllocErrorCode::FragmentationExhausted,
        }
    }

    /// Whether retrying after freeing memory can succeed
    pub const fn is_recoverable(&self) -> bool {
        self.code().is_recoverable()
    }
}
