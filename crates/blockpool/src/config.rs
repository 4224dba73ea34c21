//! Block pool configuration

use std::borrow::Cow;

use crate::error::{PoolError, PoolResult};

/// Default alignment of the backing store (word size on 64-bit targets)
pub const MIN_ALIGN: usize = 8;

/// Configuration for a block pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Label used in log events and `OutOfMemory` errors
    pub name: Cow<'static, str>,

    /// Alignment of the backing store; must be a power of two.
    /// Each block is aligned to `gcd(alignment, block_size)`.
    pub alignment: usize,

    /// Fill pattern byte for newly allocated blocks (for debugging)
    pub alloc_pattern: Option<u8>,
    /// Fill pattern byte for freed blocks (for debugging)
    pub dealloc_pattern: Option<u8>,

    /// Enable statistics tracking
    pub track_stats: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("block-pool"),
            alignment: MIN_ALIGN,
            alloc_pattern: if cfg!(debug_assertions) {
                Some(0xBB)
            } else {
                None
            },
            dealloc_pattern: if cfg!(debug_assertions) {
                Some(0xDD)
            } else {
                None
            },
            track_stats: cfg!(debug_assertions),
        }
    }
}

impl PoolConfig {
    /// Production configuration - optimized for performance
    #[must_use]
    pub fn production() -> Self {
        Self {
            alloc_pattern: None,
            dealloc_pattern: None,
            track_stats: false,
            ..Self::default()
        }
    }

    /// Debug configuration - optimized for debugging
    #[must_use]
    pub fn debug() -> Self {
        Self {
            alloc_pattern: Some(0xBB),
            dealloc_pattern: Some(0xDD),
            track_stats: true,
            ..Self::default()
        }
    }

    /// Performance configuration - minimal overhead, cache-line aligned store
    #[must_use]
    pub fn performance() -> Self {
        Self {
            alignment: 64,
            alloc_pattern: None,
            dealloc_pattern: None,
            track_stats: false,
            ..Self::default()
        }
    }

    /// Set the pool label
    #[must_use = "builder methods must be chained or built"]
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the backing store alignment
    #[must_use = "builder methods must be chained or built"]
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Enable or disable statistics tracking
    #[must_use = "builder methods must be chained or built"]
    pub fn with_stats(mut self, track_stats: bool) -> Self {
        self.track_stats = track_stats;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> PoolResult<()> {
        if !self.alignment.is_power_of_two() {
            return Err(PoolError::init_failure(&format!(
                "alignment {} is not a power of two",
                self.alignment
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let production = PoolConfig::production();
        assert!(!production.track_stats);
        assert_eq!(production.alloc_pattern, None);

        let debug = PoolConfig::debug();
        assert!(debug.track_stats);
        assert_eq!(debug.alloc_pattern, Some(0xBB));
        assert_eq!(debug.dealloc_pattern, Some(0xDD));

        assert_eq!(PoolConfig::performance().alignment, 64);
    }

    #[test]
    fn test_builder() {
        let config = PoolConfig::production()
            .with_name("tls-records")
            .with_alignment(16)
            .with_stats(true);

        assert_eq!(config.name, "tls-records");
        assert_eq!(config.alignment, 16);
        assert!(config.track_stats);
    }

    #[test]
    fn test_validate_alignment() {
        assert!(PoolConfig::default().validate().is_ok());
        assert!(PoolConfig::default().with_alignment(0).validate().is_err());
        assert!(PoolConfig::default().with_alignment(24).validate().is_err());
    }
}
