//! Cache configuration.

use std::time::Duration;

/// How long a resolved account id stays valid.
pub const ACCOUNT_ID_TTL: Duration = Duration::from_secs(600);

/// Configuration for an expiring cache instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live stamped on every entry the owner inserts.
    pub ttl: Duration,

    /// How often a background sweep drops expired entries.
    /// `None` leaves cleanup to lazy eviction on read.
    pub sweep_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300), // 5 minutes
            sweep_interval: Some(Duration::from_secs(60)),
        }
    }
}

impl CacheConfig {
    /// Set time-to-live for cache entries.
    #[allow(dead_code)]
    #[must_use]
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.ttl = duration;
        self
    }

    /// Set the background sweep interval.
    #[must_use]
    pub fn sweep_every(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Disable the background sweep.
    #[allow(dead_code)]
    pub fn no_sweep(mut self) -> Self {
        self.sweep_interval = None;
        self
    }

    /// Config for username to account id resolution.
    /// The TTL is fixed; callers never pick one per lookup.
    pub fn account_ids() -> Self {
        Self {
            ttl: ACCOUNT_ID_TTL,
            sweep_interval: Some(Duration::from_secs(60)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_ids_preset() {
        let config = CacheConfig::account_ids();
        assert_eq!(config.ttl, Duration::from_secs(600));
        assert!(config.sweep_interval.is_some());
    }

    #[test]
    fn test_builder() {
        let config = CacheConfig::default()
            .ttl(Duration::from_secs(5))
            .no_sweep();
        assert_eq!(config.ttl, Duration::from_secs(5));
        assert_eq!(config.sweep_interval, None);

        let config = config.sweep_every(Duration::from_secs(1));
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(1)));
    }
}
