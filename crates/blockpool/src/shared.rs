//! Shared pool behind a single mutex
//!
//! `BlockPool` does no locking of its own. `SharedBlockPool` serializes every
//! operation through one `parking_lot::Mutex`, so the pool can be handed to
//! several threads without changing its invariants.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::block::{BlockRef, BlockState};
use crate::error::PoolResult;
use crate::pool::BlockPool;
use crate::stats::PoolStats;

/// Cloneable, thread-safe handle to a [`BlockPool`]
///
/// # Example
/// ```
/// use blockpool::{BlockPool, SharedBlockPool};
///
/// let shared = SharedBlockPool::new(BlockPool::new(128, 16)?);
/// let worker = shared.clone();
///
/// std::thread::spawn(move || {
///     let block = worker.allocate()?;
///     worker.with_block_mut(block, |bytes| bytes[0] = 1)?;
///     worker.free(block)
/// })
/// .join()
/// .unwrap()?;
///
/// assert_eq!(shared.available(), 16);
/// # Ok::<(), blockpool::PoolError>(())
/// ```
#[derive(Clone, Debug)]
pub struct SharedBlockPool {
    inner: Arc<Mutex<BlockPool>>,
}

impl SharedBlockPool {
    pub fn new(pool: BlockPool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    pub fn allocate(&self) -> PoolResult<BlockRef> {
        self.inner.lock().allocate()
    }

    pub fn free(&self, block: BlockRef) -> PoolResult<()> {
        self.inner.lock().free(block)
    }

    /// Run `f` over the bytes of an allocated block while holding the lock
    pub fn with_block_mut<R>(
        &self,
        block: BlockRef,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> PoolResult<R> {
        let mut pool = self.inner.lock();
        Ok(f(pool.block_mut(block)?))
    }

    pub fn state_of(&self, block: BlockRef) -> PoolResult<BlockState> {
        self.inner.lock().state_of(block)
    }

    pub fn available(&self) -> usize {
        self.inner.lock().available()
    }

    pub fn in_use(&self) -> usize {
        self.inner.lock().in_use()
    }

    pub fn stats(&self) -> PoolStats {
        self.inner.lock().stats()
    }

    pub fn check_consistency(&self) -> PoolResult<()> {
        self.inner.lock().check_consistency()
    }

    /// Run `f` with exclusive access to the underlying pool
    pub fn with_pool<R>(&self, f: impl FnOnce(&mut BlockPool) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Recover the pool once this is the last handle
    pub fn try_into_inner(self) -> Result<BlockPool, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl From<BlockPool> for SharedBlockPool {
    fn from(pool: BlockPool) -> Self {
        Self::new(pool)
    }
}
