//! Fixed-block pool allocator
//!
//! A `BlockPool` pre-allocates one contiguous region and serves fixed-size
//! blocks from it with O(1) allocate/free. Bookkeeping lives outside the
//! blocks:
//!
//! - a LIFO free list of block indices supplies blocks to `allocate`
//! - an occupancy bitmap, indexed by the block's position in the store,
//!   records which blocks are loaned out
//!
//! `free` maps the address back to an index, so foreign and misaligned
//! addresses as well as double frees are rejected without touching state.
//!
//! The pool is single-threaded: mutating operations take `&mut self`. Wrap it
//! in [`SharedBlockPool`](crate::SharedBlockPool) to share it.

use core::fmt;

#[cfg(feature = "logging")]
use tracing::debug;

use crate::bitmap::OccupancyBitmap;
use crate::block::{BlockRef, BlockState};
use crate::config::PoolConfig;
use crate::error::{AddressFault, CorruptionKind, PoolError, PoolResult};
use crate::free_list::FreeListStack;
use crate::stats::PoolStats;
use crate::store::BackingStore;

/// Fixed-block memory pool
///
/// # Example
/// ```
/// use blockpool::BlockPool;
///
/// let mut pool = BlockPool::new(64, 4)?;
/// let block = pool.allocate()?;
/// pool.block_mut(block)?.fill(0x2A);
/// assert_eq!(pool.available(), 3);
///
/// pool.free(block)?;
/// assert_eq!(pool.available(), 4);
/// # Ok::<(), blockpool::PoolError>(())
/// ```
pub struct BlockPool {
    store: BackingStore,
    free_list: FreeListStack,
    bitmap: OccupancyBitmap,
    config: PoolConfig,
    stats: PoolStats,
}

impl BlockPool {
    /// Create a pool of `block_count` blocks of `block_size` bytes each
    pub fn new(block_size: usize, block_count: usize) -> PoolResult<Self> {
        Self::with_config(block_size, block_count, PoolConfig::default())
    }

    /// Create a pool with custom configuration
    ///
    /// The free list is populated in index order, index 0 first, so the first
    /// `allocate` returns the block at index `block_count - 1`.
    ///
    /// If any allocation fails the partially built components are dropped and
    /// nothing stays allocated.
    pub fn with_config(
        block_size: usize,
        block_count: usize,
        config: PoolConfig,
    ) -> PoolResult<Self> {
        if block_size == 0 {
            return Err(PoolError::init_failure("block size must be greater than 0"));
        }
        if block_count == 0 {
            return Err(PoolError::init_failure("block count must be greater than 0"));
        }
        config.validate()?;

        let store = BackingStore::new(block_size, block_count, config.alignment)?;
        let mut free_list = FreeListStack::with_capacity(block_count)?;
        let bitmap = OccupancyBitmap::new(block_count)?;

        for index in 0..block_count {
            free_list.push(index).map_err(|_| {
                PoolError::corruption("free list", CorruptionKind::FreeListFull { index })
            })?;
        }

        #[cfg(feature = "logging")]
        debug!(
            pool = %config.name,
            block_size,
            block_count,
            start = store.base_addr(),
            end = store.base_addr() + store.len(),
            "Block pool initialized"
        );

        Ok(Self {
            store,
            free_list,
            bitmap,
            config,
            stats: PoolStats::default(),
        })
    }

    /// Take a free block from the pool
    ///
    /// Returns the most recently freed block first. None of the failure paths
    /// allocate on the heap.
    pub fn allocate(&mut self) -> PoolResult<BlockRef> {
        let Ok(index) = self.free_list.pop() else {
            if self.config.track_stats {
                self.stats.record_failed_allocation();
            }
            return Err(PoolError::out_of_memory(self.config.name.clone(), self.capacity()));
        };

        let block = match self.checkout(index) {
            Ok(block) => block,
            Err(e) => {
                // Put it back so the failed call leaves no trace.
                if self.free_list.push(index).is_err() {
                    return Err(PoolError::corruption(
                        "free list",
                        CorruptionKind::FreeListFull { index },
                    ));
                }
                return Err(e);
            }
        };

        self.bitmap.mark_allocated(index);
        if self.config.track_stats {
            let in_use = self.in_use();
            self.stats.record_allocation(in_use);
        }

        #[cfg(feature = "logging")]
        debug!(
            pool = %self.config.name,
            block = ?block.as_ptr(),
            index,
            free = self.available(),
            "Block allocated"
        );

        Ok(block)
    }

    /// Resolve a freshly popped index to its block without touching bookkeeping
    fn checkout(&mut self, index: usize) -> PoolResult<BlockRef> {
        if self.bitmap.is_allocated(index) {
            return Err(PoolError::corruption(
                "occupancy bitmap",
                CorruptionKind::FreeBlockMarkedAllocated { index },
            ));
        }

        let address = self.store.block_address(index)?;
        if let Some(pattern) = self.config.alloc_pattern {
            self.store.fill(index, pattern)?;
        }
        Ok(BlockRef::new(address))
    }

    /// Return a block to the pool
    ///
    /// Fails without changing any state if the reference does not name a
    /// block of this pool, is not on a block boundary, or is already free.
    pub fn free(&mut self, block: BlockRef) -> PoolResult<()> {
        let result = self.release(block);
        if result.is_err() && self.config.track_stats {
            self.stats.record_rejected_free();
        }
        result
    }

    fn release(&mut self, block: BlockRef) -> PoolResult<()> {
        let index = self.store.validate(block.addr())?;

        if !self.bitmap.is_allocated(index) {
            return Err(PoolError::double_free(block.addr(), index));
        }

        // Bit set but list already full: the two structures disagree.
        if self.free_list.push(index).is_err() {
            return Err(PoolError::corruption(
                "free list",
                CorruptionKind::FreeListFull { index },
            ));
        }

        self.bitmap.mark_free(index);
        if let Some(pattern) = self.config.dealloc_pattern {
            // index came from validate, so this cannot fail
            self.store.fill(index, pattern)?;
        }
        if self.config.track_stats {
            self.stats.record_deallocation();
        }

        #[cfg(feature = "logging")]
        debug!(
            pool = %self.config.name,
            block = ?block.as_ptr(),
            index,
            free = self.available(),
            "Block freed"
        );

        Ok(())
    }

    /// Release the backing store, free list and bitmap together
    pub fn destroy(self) {
        #[cfg(feature = "logging")]
        debug!(
            pool = %self.config.name,
            in_use = self.in_use(),
            "Block pool destroyed"
        );

        drop(self);
    }

    // ------------------------------------------------------------------------
    // Block access
    // ------------------------------------------------------------------------

    /// Bytes of an allocated block
    pub fn block(&self, block: BlockRef) -> PoolResult<&[u8]> {
        let index = self.allocated_index(block)?;
        self.store.block_slice(index)
    }

    /// Mutable bytes of an allocated block
    pub fn block_mut(&mut self, block: BlockRef) -> PoolResult<&mut [u8]> {
        let index = self.allocated_index(block)?;
        self.store.block_slice_mut(index)
    }

    fn allocated_index(&self, block: BlockRef) -> PoolResult<usize> {
        let index = self.store.validate(block.addr())?;
        if !self.bitmap.is_allocated(index) {
            return Err(PoolError::invalid_address(block.addr(), AddressFault::NotAllocated));
        }
        Ok(index)
    }

    /// Occupancy of the block named by `block`
    pub fn state_of(&self, block: BlockRef) -> PoolResult<BlockState> {
        let index = self.store.validate(block.addr())?;
        Ok(if self.bitmap.is_allocated(index) {
            BlockState::Allocated
        } else {
            BlockState::Free
        })
    }

    /// Occupancy of the block at `index` in the backing store
    pub fn state_at(&self, index: usize) -> Option<BlockState> {
        (index < self.capacity()).then(|| {
            if self.bitmap.is_allocated(index) {
                BlockState::Allocated
            } else {
                BlockState::Free
            }
        })
    }

    /// Whether `block` names a block boundary inside this pool
    pub fn contains(&self, block: BlockRef) -> bool {
        let offset = block.addr().wrapping_sub(self.store.base_addr());
        offset < self.store.len() && offset % self.store.block_size() == 0
    }

    /// Position of `block` in the backing store
    pub fn index_of(&self, block: BlockRef) -> PoolResult<usize> {
        self.store.validate(block.addr())
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    /// Bytes per block
    #[inline]
    pub fn block_size(&self) -> usize {
        self.store.block_size()
    }

    /// Total number of blocks
    #[inline]
    pub fn capacity(&self) -> usize {
        self.store.block_count()
    }

    /// Number of free blocks
    #[inline]
    pub fn available(&self) -> usize {
        self.free_list.len()
    }

    /// Number of blocks currently loaned out
    #[inline]
    pub fn in_use(&self) -> usize {
        self.capacity() - self.available()
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.available() == 0
    }

    /// Fraction of blocks loaned out, in `[0.0, 1.0]`
    pub fn utilization(&self) -> f64 {
        self.in_use() as f64 / self.capacity() as f64
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Statistics snapshot; all zero unless `track_stats` is enabled
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Re-derive the bookkeeping invariants in O(n)
    ///
    /// Checks that every free list entry names a distinct in-range block whose
    /// bit is clear, and that every other block's bit is set.
    pub fn check_consistency(&self) -> PoolResult<()> {
        let capacity = self.capacity();
        let mut seen = OccupancyBitmap::new(capacity)?;

        for index in self.free_list.iter() {
            if index >= capacity {
                return Err(PoolError::corruption(
                    "free list",
                    CorruptionKind::IndexOutOfRange { index, capacity },
                ));
            }
            if seen.is_allocated(index) {
                return Err(PoolError::corruption(
                    "free list",
                    CorruptionKind::DuplicateEntry { index },
                ));
            }
            seen.mark_allocated(index);

            if self.bitmap.is_allocated(index) {
                return Err(PoolError::corruption(
                    "occupancy bitmap",
                    CorruptionKind::FreeBlockMarkedAllocated { index },
                ));
            }
        }

        if self.bitmap.has_stray_bits() {
            return Err(PoolError::corruption(
                "occupancy bitmap",
                CorruptionKind::StrayBits,
            ));
        }

        let allocated = self.bitmap.count_allocated();
        let free = self.free_list.len();
        if allocated + free != capacity {
            return Err(PoolError::corruption(
                "occupancy bitmap",
                CorruptionKind::CountMismatch {
                    allocated,
                    free,
                    capacity,
                },
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for BlockPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockPool")
            .field("name", &self.config.name)
            .field("block_size", &self.block_size())
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use core::ptr::NonNull;

    use super::*;

    fn debug_pool(block_size: usize, block_count: usize) -> BlockPool {
        BlockPool::with_config(block_size, block_count, PoolConfig::debug()).unwrap()
    }

    #[test]
    fn test_init_all_free() {
        let pool = debug_pool(64, 10);

        assert_eq!(pool.available(), 10);
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.block_size(), 64);
        assert_eq!(pool.capacity(), 10);
        assert!((0..10).all(|i| pool.state_at(i) == Some(BlockState::Free)));
        assert_eq!(pool.state_at(10), None);
        pool.check_consistency().unwrap();
    }

    #[test]
    fn test_init_rejects_zero_arguments() {
        assert!(matches!(
            BlockPool::new(0, 4),
            Err(PoolError::InitFailure { .. })
        ));
        assert!(matches!(
            BlockPool::new(64, 0),
            Err(PoolError::InitFailure { .. })
        ));
    }

    #[test]
    fn test_init_rejects_bad_alignment() {
        let config = PoolConfig::default().with_alignment(3);
        assert!(matches!(
            BlockPool::with_config(64, 4, config),
            Err(PoolError::InitFailure { .. })
        ));
    }

    #[test]
    fn test_first_allocation_is_last_index() {
        let mut pool = debug_pool(32, 5);
        let block = pool.allocate().unwrap();

        assert_eq!(pool.index_of(block).unwrap(), 4);
        assert_eq!(pool.state_at(4), Some(BlockState::Allocated));
    }

    #[test]
    fn test_four_blocks_sixty_four_apart() {
        let mut pool = debug_pool(64, 4);

        let blocks: Vec<_> = (0..4).map(|_| pool.allocate().unwrap()).collect();
        let mut addrs: Vec<_> = blocks.iter().map(BlockRef::addr).collect();
        addrs.sort_unstable();
        addrs.dedup();
        assert_eq!(addrs.len(), 4);
        assert!(addrs.windows(2).all(|w| w[1] - w[0] == 64));

        assert!(matches!(
            pool.allocate(),
            Err(PoolError::OutOfMemory { capacity: 4, .. })
        ));

        pool.free(blocks[2]).unwrap();
        assert_eq!(pool.allocate().unwrap(), blocks[2]);
        pool.check_consistency().unwrap();
    }

    #[test]
    fn test_round_trip_restores_state() {
        let mut pool = debug_pool(16, 8);
        let _held = pool.allocate().unwrap();
        let before: Vec<_> = (0..8).map(|i| pool.state_at(i)).collect();
        let available = pool.available();

        let block = pool.allocate().unwrap();
        pool.free(block).unwrap();

        assert_eq!(pool.available(), available);
        assert_eq!((0..8).map(|i| pool.state_at(i)).collect::<Vec<_>>(), before);
    }

    #[test]
    fn test_exhaustion_has_no_side_effects() {
        let mut pool = debug_pool(8, 3);
        for _ in 0..3 {
            pool.allocate().unwrap();
        }
        assert!(pool.is_exhausted());

        let err = pool.allocate().unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.code(), "POOL:ALLOC:EXHAUSTED");
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.stats().failed_allocations, 1);
        pool.check_consistency().unwrap();
    }

    #[test]
    fn test_double_free_detected() {
        let mut pool = debug_pool(64, 4);
        let block = pool.allocate().unwrap();

        pool.free(block).unwrap();
        let available = pool.available();
        assert!(matches!(
            pool.free(block),
            Err(PoolError::DoubleFree { index: 3, .. })
        ));
        assert_eq!(pool.available(), available);
        assert_eq!(pool.stats().rejected_frees, 1);
        pool.check_consistency().unwrap();
    }

    #[test]
    fn test_double_free_detected_out_of_order() {
        let mut pool = debug_pool(64, 4);
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        let c = pool.allocate().unwrap();

        pool.free(a).unwrap();
        pool.free(c).unwrap();
        assert!(matches!(pool.free(a), Err(PoolError::DoubleFree { .. })));
        assert_eq!(pool.state_of(b).unwrap(), BlockState::Allocated);
        pool.free(b).unwrap();
        pool.check_consistency().unwrap();
    }

    #[test]
    fn test_foreign_pointer_rejected() {
        let mut pool = debug_pool(64, 4);
        let mut other = debug_pool(64, 4);
        let foreign = other.allocate().unwrap();

        assert!(matches!(
            pool.free(foreign),
            Err(PoolError::InvalidAddress { .. })
        ));
        assert!(!pool.contains(foreign));
        assert_eq!(pool.available(), 4);

        let mut local = 0u64;
        let stack_ref = BlockRef::from_raw(NonNull::from(&mut local).cast());
        assert!(matches!(
            pool.free(stack_ref),
            Err(PoolError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_misaligned_pointer_rejected() {
        let mut pool = debug_pool(64, 4);
        let block = pool.allocate().unwrap();
        // SAFETY: offset stays inside the 64-byte block.
        let inside = unsafe { block.as_non_null().add(1) };

        assert!(matches!(
            pool.free(BlockRef::from_raw(inside)),
            Err(PoolError::InvalidAddress { .. })
        ));
        assert_eq!(pool.state_of(block).unwrap(), BlockState::Allocated);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn test_block_access_and_fill_patterns() {
        let mut pool = debug_pool(16, 2);
        let block = pool.allocate().unwrap();
        assert!(pool.block(block).unwrap().iter().all(|&b| b == 0xBB));

        pool.block_mut(block).unwrap().copy_from_slice(&[7u8; 16]);
        assert_eq!(pool.block(block).unwrap(), &[7u8; 16]);

        pool.free(block).unwrap();
        assert!(matches!(
            pool.block(block),
            Err(PoolError::InvalidAddress { .. })
        ));
        assert_eq!(pool.state_of(block).unwrap(), BlockState::Free);
    }

    #[test]
    fn test_production_config_skips_stats() {
        let mut pool = BlockPool::with_config(8, 2, PoolConfig::production()).unwrap();
        let block = pool.allocate().unwrap();
        pool.free(block).unwrap();
        assert_eq!(pool.stats(), PoolStats::default());
    }

    #[test]
    fn test_stats_peak_usage() {
        let mut pool = debug_pool(8, 4);
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        pool.free(a).unwrap();
        pool.free(b).unwrap();
        let _c = pool.allocate().unwrap();

        let stats = pool.stats();
        assert_eq!(stats.allocations, 3);
        assert_eq!(stats.deallocations, 2);
        assert_eq!(stats.peak_in_use, 2);
        assert!((pool.utilization() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_corrupted_bitmap_is_reported() {
        let mut pool = debug_pool(8, 4);
        // Mark a block that is still on the free list.
        pool.bitmap.mark_allocated(3);

        let expected = PoolError::Corruption {
            component: "occupancy bitmap",
            kind: CorruptionKind::FreeBlockMarkedAllocated { index: 3 },
        };
        assert_eq!(pool.check_consistency(), Err(expected.clone()));
        assert_eq!(pool.allocate(), Err(expected));
        assert_eq!(pool.available(), 4);
    }

    #[test]
    fn test_free_on_full_list_is_corruption() {
        let mut pool = debug_pool(8, 2);
        let block = pool.allocate().unwrap();
        // Desync: block goes back on the list while its bit stays set.
        pool.free_list.push(pool.index_of(block).unwrap()).unwrap();

        assert_eq!(
            pool.free(block),
            Err(PoolError::Corruption {
                component: "free list",
                kind: CorruptionKind::FreeListFull { index: 1 },
            })
        );
        assert_eq!(pool.available(), 2);
        assert_eq!(pool.state_of(block).unwrap(), BlockState::Allocated);
    }

    #[test]
    fn test_out_of_memory_carries_pool_name() {
        let config = PoolConfig::debug().with_name("frames");
        let mut pool = BlockPool::with_config(8, 1, config).unwrap();
        let _held = pool.allocate().unwrap();

        assert_eq!(
            pool.allocate(),
            Err(PoolError::OutOfMemory {
                pool: "frames".into(),
                capacity: 1,
            })
        );
    }

    #[test]
    fn test_not_allocated_block_access_names_the_fault() {
        let mut pool = debug_pool(8, 2);
        let block = pool.allocate().unwrap();
        pool.free(block).unwrap();

        assert_eq!(
            pool.block_mut(block).map(|b| b.len()),
            Err(PoolError::InvalidAddress {
                address: block.addr(),
                fault: AddressFault::NotAllocated,
            })
        );
    }
}
