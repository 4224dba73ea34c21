//! Occupancy bitmap keyed by block index

use crate::error::{PoolError, PoolResult};

/// Each bit corresponds to a single block: set = allocated, clear = free.
pub(crate) struct OccupancyBitmap {
    bits: Vec<u8>,
    /// Number of tracked blocks.
    len: usize,
}

impl OccupancyBitmap {
    /// Create an all-clear bitmap of `ceil(len / 8)` bytes.
    pub(crate) fn new(len: usize) -> PoolResult<Self> {
        let bytes = len.div_ceil(8);
        let mut bits = Vec::new();
        bits.try_reserve_exact(bytes).map_err(|e| {
            PoolError::init_failure(&format!("failed to allocate occupancy bitmap: {e}"))
        })?;
        bits.resize(bytes, 0);

        Ok(Self { bits, len })
    }

    #[inline]
    pub(crate) fn mark_allocated(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.bits[index / 8] |= 1 << (index % 8);
    }

    #[inline]
    pub(crate) fn mark_free(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.bits[index / 8] &= !(1 << (index % 8));
    }

    #[inline]
    pub(crate) fn is_allocated(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        self.bits[index / 8] & (1 << (index % 8)) != 0
    }

    /// Number of set bits among the tracked blocks.
    pub(crate) fn count_allocated(&self) -> usize {
        let full = self.len / 8;
        let mut count: usize = self.bits[..full]
            .iter()
            .map(|byte| byte.count_ones() as usize)
            .sum();

        let tail = self.len % 8;
        if tail != 0 {
            let mask = (1u8 << tail) - 1;
            count += (self.bits[full] & mask).count_ones() as usize;
        }
        count
    }

    /// True if any bit beyond `len` in the last byte is set.
    pub(crate) fn has_stray_bits(&self) -> bool {
        let tail = self.len % 8;
        tail != 0 && self.bits[self.len / 8] & !((1u8 << tail) - 1) != 0
    }

    #[cfg(test)]
    pub(crate) fn byte_len(&self) -> usize {
        self.bits.len()
    }
}
