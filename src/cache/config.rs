//! Cache configuration.

use std::time::Duration;

/// Configuration for an in-memory cache client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_capacity: u64,

    /// Time-to-live for cache entries.
    /// After this duration, entries are automatically evicted.
    pub ttl: Option<Duration>,

    /// Time-to-idle for cache entries.
    /// Entries are evicted if not accessed within this duration.
    pub tti: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Some(Duration::from_secs(300)), // 5 minutes
            tti: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with the given max capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            max_capacity,
            ..Default::default()
        }
    }

    /// Set max capacity for cache (builder pattern).
    #[must_use]
    pub fn max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Set time-to-live for cache entries.
    #[must_use]
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.ttl = Some(duration);
        self
    }

    /// Set time-to-idle for cache entries.
    #[must_use]
    pub fn tti(mut self, duration: Duration) -> Self {
        self.tti = Some(duration);
        self
    }

    /// Disable TTL (entries never expire based on time).
    #[must_use]
    pub fn no_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = CacheConfig::with_capacity(50)
            .tti(Duration::from_secs(30))
            .no_ttl();

        assert_eq!(config.max_capacity, 50);
        assert_eq!(config.ttl, None);
        assert_eq!(config.tti, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_builders_chain_from_default() {
        let config = CacheConfig::default()
            .max_capacity(5)
            .ttl(Duration::from_secs(9));

        assert_eq!(config.max_capacity, 5);
        assert_eq!(config.ttl, Some(Duration::from_secs(9)));
        assert_eq!(config.tti, None);
    }
}
