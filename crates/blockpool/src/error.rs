//! Error types for blockpool
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.

use std::borrow::Cow;

use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::{debug, error};

// ============================================================================
// Main Error Type
// ============================================================================

/// Block pool errors
///
/// Every fallible pool operation reports one of these synchronously. None of
/// them leaves the pool in an inconsistent state.
///
/// Only `InitFailure` owns heap data. The errors returned by `allocate` and
/// `free` are built without touching the global allocator, as long as the
/// pool name is a `Cow::Borrowed`.
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Construction failed; nothing was left allocated.
    #[error("Pool initialization failed: {reason}")]
    InitFailure { reason: String },

    /// Every block is currently loaned out.
    #[error("Block pool '{pool}' out of memory (capacity: {capacity} blocks)")]
    OutOfMemory {
        pool: Cow<'static, str>,
        capacity: usize,
    },

    /// The address is outside the backing store or not on a block boundary.
    #[error("Invalid block address {address:#x}: {fault}")]
    InvalidAddress { address: usize, fault: AddressFault },

    /// The block is already free.
    #[error("Double free of block {address:#x} (index {index})")]
    DoubleFree { address: usize, index: usize },

    /// Internal bookkeeping would be violated by the operation.
    #[error("Pool corruption detected in {component}: {kind}")]
    Corruption {
        component: &'static str,
        kind: CorruptionKind,
    },
}

/// Why an address was rejected
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFault {
    #[error("outside pool region")]
    OutsideRegion,

    #[error("offset {offset} is not a multiple of block size {block_size}")]
    Misaligned { offset: usize, block_size: usize },

    #[error("block is not allocated")]
    NotAllocated,
}

/// Which bookkeeping rule a `Corruption` error found broken
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionKind {
    #[error("free list is full while returning block {index}")]
    FreeListFull { index: usize },

    #[error("block {index} is on the free list but marked allocated")]
    FreeBlockMarkedAllocated { index: usize },

    #[error("block {index} is listed twice")]
    DuplicateEntry { index: usize },

    #[error("index {index} is outside the pool ({capacity} blocks)")]
    IndexOutOfRange { index: usize, capacity: usize },

    #[error("bits set beyond the last block")]
    StrayBits,

    #[error("{allocated} allocated + {free} free != {capacity} blocks")]
    CountMismatch {
        allocated: usize,
        free: usize,
        capacity: usize,
    },
}

impl PoolError {
    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }

    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InitFailure { .. } => "POOL:INIT:FAILED",
            Self::OutOfMemory { .. } => "POOL:ALLOC:EXHAUSTED",
            Self::InvalidAddress { .. } => "POOL:FREE:INVALID_ADDRESS",
            Self::DoubleFree { .. } => "POOL:FREE:DOUBLE_FREE",
            Self::Corruption { .. } => "POOL:SYSTEM:CORRUPTION",
        }
    }

    /// Check if this error points at a caller bug rather than a pool condition
    #[must_use]
    pub fn is_caller_bug(&self) -> bool {
        matches!(self, Self::InvalidAddress { .. } | Self::DoubleFree { .. })
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create initialization failed error
    pub fn init_failure(reason: &str) -> Self {
        #[cfg(feature = "logging")]
        error!("Block pool initialization failed: {reason}");

        Self::InitFailure {
            reason: reason.to_string(),
        }
    }

    /// Create out of memory error
    ///
    /// Logged at debug level: exhaustion is ordinary backpressure.
    pub fn out_of_memory(pool: Cow<'static, str>, capacity: usize) -> Self {
        #[cfg(feature = "logging")]
        debug!(pool = %pool, capacity, "Block pool exhausted");

        Self::OutOfMemory { pool, capacity }
    }

    /// Create invalid address error
    pub fn invalid_address(address: usize, fault: AddressFault) -> Self {
        #[cfg(feature = "logging")]
        error!("Invalid block address {address:#x}: {fault}");

        Self::InvalidAddress { address, fault }
    }

    /// Create double free error
    pub fn double_free(address: usize, index: usize) -> Self {
        #[cfg(feature = "logging")]
        error!("Double free detected for block {address:#x} (index {index})");

        Self::DoubleFree { address, index }
    }

    /// Create corruption error
    pub fn corruption(component: &'static str, kind: CorruptionKind) -> Self {
        #[cfg(feature = "logging")]
        error!("Pool corruption: {component} - {kind}");

        Self::Corruption { component, kind }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for pool operations
pub type PoolResult<T> = core::result::Result<T, PoolError>;

/// Generic result type alias
pub type Result<T> = PoolResult<T>;

// ============================================================================
// Tests
// ============================================================================
