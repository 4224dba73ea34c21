//! Pool usage statistics

/// Counters maintained by a pool when `PoolConfig::track_stats` is enabled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Successful allocations
    pub allocations: u64,
    /// Successful frees
    pub deallocations: u64,
    /// Allocations refused because the pool was exhausted
    pub failed_allocations: u64,
    /// Frees refused as invalid address, double free or corruption
    pub rejected_frees: u64,
    /// Highest number of blocks loaned out at once
    pub peak_in_use: usize,
}

impl PoolStats {
    pub(crate) fn record_allocation(&mut self, in_use: usize) {
        self.allocations += 1;
        self.peak_in_use = self.peak_in_use.max(in_use);
    }

    pub(crate) fn record_deallocation(&mut self) {
        self.deallocations += 1;
    }

    pub(crate) fn record_failed_allocation(&mut self) {
        self.failed_allocations += 1;
    }

    pub(crate) fn record_rejected_free(&mut self) {
        self.rejected_frees += 1;
    }

    /// Allocations not yet matched by a free
    #[must_use]
    pub fn outstanding(&self) -> u64 {
        self.allocations.saturating_sub(self.deallocations)
    }
}
