//! Opaque block references handed out by a pool

use core::fmt;
use core::ptr::NonNull;

/// Address-like handle to one block loaned out by a [`BlockPool`].
///
/// A `BlockRef` is just an address: it is `Copy`, carries no lifetime and
/// does not keep the pool alive. The pool validates every `BlockRef` it is
/// given, so a stale, foreign or misaligned reference is reported as an error
/// rather than corrupting the pool. Reading or writing through
/// [`as_ptr`](Self::as_ptr) is `unsafe` and only valid while the block is
/// allocated and the pool exists.
///
/// [`BlockPool`]: crate::BlockPool
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef {
    ptr: NonNull<u8>,
}

// SAFETY: a BlockRef is an inert address. Dereferencing it requires `unsafe`
// and the caller takes on the aliasing contract at that point.
unsafe impl Send for BlockRef {}
// SAFETY: see above; shared references to a BlockRef expose only the address.
unsafe impl Sync for BlockRef {}

impl BlockRef {
    #[inline]
    pub(crate) fn new(ptr: NonNull<u8>) -> Self {
        Self { ptr }
    }

    /// Wrap an arbitrary pointer.
    ///
    /// Nothing is checked here; a pool rejects the reference on `free` if it
    /// does not name one of its blocks.
    #[inline]
    pub fn from_raw(ptr: NonNull<u8>) -> Self {
        Self { ptr }
    }

    /// Start of the block
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Numeric address of the block
    #[inline]
    pub fn addr(&self) -> usize {
        self.ptr.addr().get()
    }
}

impl fmt::Debug for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BlockRef").field(&self.ptr).finish()
    }
}

impl fmt::Pointer for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.ptr, f)
    }
}

/// Occupancy of a single block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockState {
    /// On the free list, available to `allocate`
    Free,
    /// Loaned to a caller
    Allocated,
}
