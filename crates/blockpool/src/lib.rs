//! # blockpool
//!
//! Fixed-block memory pool allocator.
//!
//! A pool reserves one contiguous region of `block_size * block_count` bytes
//! up front and then hands out fixed-size blocks from it:
//!
//! - O(1) allocate and free, no calls into the global allocator after
//!   construction
//! - no metadata stored inside blocks; occupancy is tracked by an out-of-band
//!   bitmap indexed by block position
//! - double frees, foreign pointers and misaligned pointers are reported as
//!   errors instead of corrupting the pool
//! - LIFO reuse: the most recently freed block is the next one handed out
//!
//! ## Quick Start
//!
//! ```rust
//! use blockpool::prelude::*;
//!
//! let mut pool = BlockPool::new(64, 4)?;
//!
//! let a = pool.allocate()?;
//! let b = pool.allocate()?;
//! pool.block_mut(a)?[..5].copy_from_slice(b"hello");
//!
//! pool.free(b)?;
//! assert_eq!(pool.allocate()?, b);
//!
//! pool.free(a)?;
//! assert!(matches!(pool.free(a), Err(PoolError::DoubleFree { .. })));
//! # Ok::<(), PoolError>(())
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured `tracing` events for pool lifecycle,
//!   allocation and rejected frees
//!
//! ## Threading
//!
//! [`BlockPool`] is single-threaded and does no locking; every mutating
//! operation takes `&mut self`. Use [`SharedBlockPool`] to put a pool behind a
//! mutex, or give each worker its own pool.

#![cfg_attr(docsrs, feature(doc_cfg))]
// The backing store is raw memory from the global allocator.
#![allow(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod block;
pub mod config;
pub mod error;
pub mod pool;
pub mod shared;
pub mod stats;

mod bitmap;
mod free_list;
mod store;

pub use crate::block::{BlockRef, BlockState};
pub use crate::config::PoolConfig;
pub use crate::error::{AddressFault, CorruptionKind, PoolError, PoolResult, Result};
pub use crate::pool::BlockPool;
pub use crate::shared::SharedBlockPool;
pub use crate::stats::PoolStats;

// Public API exports
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::block::{BlockRef, BlockState};
    pub use crate::config::PoolConfig;
    pub use crate::error::{PoolError, PoolResult};
    pub use crate::pool::BlockPool;
    pub use crate::shared::SharedBlockPool;
    pub use crate::stats::PoolStats;
}

/// Create a pool of `block_count` blocks of `block_size` bytes.
///
/// Shorthand for [`BlockPool::new`].
pub fn init(block_size: usize, block_count: usize) -> PoolResult<BlockPool> {
    BlockPool::new(block_size, block_count)
}

/// Destroy a pool if there is one.
///
/// ```rust
/// let mut slot = Some(blockpool::init(32, 8)?);
/// blockpool::destroy(slot.take());
/// blockpool::destroy(slot.take()); // no-op
/// # Ok::<(), blockpool::PoolError>(())
/// ```
pub fn destroy(pool: Option<BlockPool>) {
    if let Some(pool) = pool {
        pool.destroy();
    }
}
