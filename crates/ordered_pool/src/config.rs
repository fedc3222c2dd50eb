//! src/config.rs
//!
//! Configuration for pool behaviour.
//!
//! Example:
//! ```ignore
//! let config = PoolConfig::builder()
//!     .concurrency_limit(4)
//!     .pool_name("vcf-filter")
//!     .await_timeout(Duration::from_secs(60))
//!     .build();
//! ```

use std::time::Duration;

/// Configuration for a [`WorkPool`](crate::WorkPool).
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Maximum number of units running at once (1 = degraded synchronous mode)
    pub concurrency_limit: usize,
    /// Namespacing string: names the artifact directory and its files.
    /// Two pools running at the same time keep distinct namespaces even with
    /// the same name (the directory itself is freshly created per pool).
    pub pool_name: String,
    /// Maximum time to wait for a single unit to publish its output before it
    /// is abandoned as unresponsive. Default: 180s
    pub await_timeout: Duration,
    /// How often `submit` re-checks for a free admission slot.
    /// Not an error timeout - just a polling interval. Default: 100ms.
    pub admission_poll: Duration,
    /// How often completion waits re-check for a published artifact. Default: 200ms.
    pub completion_poll: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 1,
            pool_name: "ordered_pool".to_string(),
            await_timeout: Duration::from_secs(180),
            admission_poll: Duration::from_millis(100),
            completion_poll: Duration::from_millis(200),
        }
    }
}

impl PoolConfig {
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }
}

/// Builder for PoolConfig with method chaining
#[derive(Default)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    /// Set the concurrency limit (must be >= 1; 1 selects synchronous mode)
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.config.concurrency_limit = limit;
        self
    }

    /// Set the pool name used to namespace artifact files
    pub fn pool_name(mut self, name: impl Into<String>) -> Self {
        self.config.pool_name = name.into();
        self
    }

    /// Set the per-unit timeout for completion waits.
    ///
    /// - Too low: May abandon workers during legitimate heavy processing
    /// - Too high: Delays detection of stuck workers.
    pub fn await_timeout(mut self, timeout: Duration) -> Self {
        self.config.await_timeout = timeout;
        self
    }

    /// Set the admission polling interval
    pub fn admission_poll(mut self, interval: Duration) -> Self {
        self.config.admission_poll = interval;
        self
    }

    /// Set the completion polling interval used by waits and final drains
    pub fn completion_poll(mut self, interval: Duration) -> Self {
        self.config.completion_poll = interval;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> PoolConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = PoolConfig::builder().build();
        assert_eq!(config.concurrency_limit, 1);
        assert_eq!(config.pool_name, "ordered_pool");
        assert_eq!(config.await_timeout, Duration::from_secs(180));
        assert_eq!(config.admission_poll, Duration::from_millis(100));
        assert_eq!(config.completion_poll, Duration::from_millis(200));
    }

    #[test]
    fn test_builder_overrides() {
        let config = PoolConfig::builder()
            .concurrency_limit(8)
            .pool_name("filter")
            .await_timeout(Duration::from_secs(5))
            .build();
        assert_eq!(config.concurrency_limit, 8);
        assert_eq!(config.pool_name, "filter");
        assert_eq!(config.await_timeout, Duration::from_secs(5));
    }
}
