//! Backing store: the single contiguous region carved into blocks
//!
//! # Safety
//!
//! - `base` comes from `alloc_zeroed` with `layout` and is released exactly
//!   once in `Drop` with the same layout
//! - every byte of the region is initialized (zeroed), so exposing a block as
//!   `&[u8]` is sound
//! - block slices are always derived from `base`, never from a caller pointer

use core::ptr::NonNull;
use std::alloc::{self, Layout};

use crate::error::{AddressFault, CorruptionKind, PoolError, PoolResult};

pub(crate) struct BackingStore {
    base: NonNull<u8>,
    layout: Layout,
    block_size: usize,
    block_count: usize,
}

// SAFETY: BackingStore exclusively owns its region; nothing else aliases it.
unsafe impl Send for BackingStore {}

impl BackingStore {
    /// Allocate a zeroed region of `block_size * block_count` bytes.
    pub(crate) fn new(block_size: usize, block_count: usize, alignment: usize) -> PoolResult<Self> {
        let size = block_size
            .checked_mul(block_count)
            .ok_or_else(|| PoolError::init_failure("backing store size overflows usize"))?;

        let layout = Layout::from_size_align(size, alignment)
            .map_err(|e| PoolError::init_failure(&format!("invalid backing store layout: {e}")))?;

        // SAFETY: size is non-zero because both factors were checked to be > 0
        // by the caller.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let base = NonNull::new(raw).ok_or_else(|| {
            PoolError::init_failure(&format!("failed to allocate {size} byte backing store"))
        })?;

        Ok(Self {
            base,
            layout,
            block_size,
            block_count,
        })
    }

    #[inline]
    pub(crate) fn base_addr(&self) -> usize {
        self.base.addr().get()
    }

    #[inline]
    pub(crate) fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub(crate) fn block_count(&self) -> usize {
        self.block_count
    }

    /// Total size of the region in bytes
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.layout.size()
    }

    /// Address of block `index`
    ///
    /// An index past the last block is reported, never turned into a pointer.
    #[inline]
    pub(crate) fn block_address(&self, index: usize) -> PoolResult<NonNull<u8>> {
        if index >= self.block_count {
            return Err(PoolError::corruption(
                "backing store",
                CorruptionKind::IndexOutOfRange {
                    index,
                    capacity: self.block_count,
                },
            ));
        }
        // SAFETY: index < block_count, so the offset stays inside the allocation.
        Ok(unsafe { self.base.add(index * self.block_size) })
    }

    /// Map an address back to its block index.
    ///
    /// Fails unless the address lies inside the region *and* sits exactly on a
    /// block boundary.
    pub(crate) fn validate(&self, address: usize) -> PoolResult<usize> {
        let offset = match address.checked_sub(self.base_addr()) {
            Some(offset) if offset < self.len() => offset,
            _ => return Err(PoolError::invalid_address(address, AddressFault::OutsideRegion)),
        };

        if offset % self.block_size != 0 {
            return Err(PoolError::invalid_address(
                address,
                AddressFault::Misaligned {
                    offset,
                    block_size: self.block_size,
                },
            ));
        }

        Ok(offset / self.block_size)
    }

    pub(crate) fn block_slice(&self, index: usize) -> PoolResult<&[u8]> {
        let ptr = self.block_address(index)?;
        // SAFETY: the block lies inside the zero-initialized region and the
        // shared borrow of self prevents concurrent mutable access via the pool.
        Ok(unsafe { core::slice::from_raw_parts(ptr.as_ptr(), self.block_size) })
    }

    pub(crate) fn block_slice_mut(&mut self, index: usize) -> PoolResult<&mut [u8]> {
        let ptr = self.block_address(index)?;
        // SAFETY: as above, and the unique borrow of self makes this the only
        // slice handed out by the pool.
        Ok(unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), self.block_size) })
    }

    #[inline]
    pub(crate) fn fill(&mut self, index: usize, byte: u8) -> PoolResult<()> {
        self.block_slice_mut(index)?.fill(byte);
        Ok(())
    }
}

impl Drop for BackingStore {
    fn drop(&mut self) {
        // SAFETY: base was allocated in `new` with exactly this layout.
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
    }
}
