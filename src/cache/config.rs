//! Cache configuration.

use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 60 * 60;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a stored value is served before the producer runs again.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self { ttl: settings.ttl }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_is_one_hour() {
        assert_eq!(CacheConfig::default().ttl, Duration::from_secs(3600));
    }
}
