//! LIFO stack of free block indices
//!
//! Storage is reserved once up front; `push` never reallocates.

use thiserror::Error;

use crate::error::{PoolError, PoolResult};

/// Failures of the raw stack operations. The pool maps these onto
/// [`PoolError`] variants.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StackError {
    #[error("free list is empty")]
    Exhausted,
    #[error("free list is full ({capacity} entries)")]
    Overflow { capacity: usize },
}

pub(crate) struct FreeListStack {
    slots: Vec<usize>,
    capacity: usize,
}

impl FreeListStack {
    pub(crate) fn with_capacity(capacity: usize) -> PoolResult<Self> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity).map_err(|e| {
            PoolError::init_failure(&format!("failed to allocate free list: {e}"))
        })?;

        Ok(Self { slots, capacity })
    }

    #[inline]
    pub(crate) fn push(&mut self, index: usize) -> Result<(), StackError> {
        if self.is_full() {
            return Err(StackError::Overflow {
                capacity: self.capacity,
            });
        }
        self.slots.push(index);
        Ok(())
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Result<usize, StackError> {
        self.slots.pop().ok_or(StackError::Exhausted)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().copied()
    }
}
