//! Cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_MAPPING_CAPACITY: usize = 50;
const DEFAULT_MAPPING_TTL_SECONDS: u64 = 30 * 60;

/// Mapping-routine cache knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached mapping routines.
    pub mapping_capacity: usize,
    /// Seconds a cached routine stays visible to readers.
    pub mapping_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mapping_capacity: DEFAULT_MAPPING_CAPACITY,
            mapping_ttl_seconds: DEFAULT_MAPPING_TTL_SECONDS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            mapping_capacity: settings.mapping_capacity,
            mapping_ttl_seconds: settings.mapping_ttl_seconds,
        }
    }
}

impl CacheConfig {
    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.mapping_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.mapping_ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.mapping_capacity, 50);
        assert_eq!(config.mapping_ttl_seconds, 1800);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            mapping_capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.capacity_non_zero().get(), 1);
    }
}
