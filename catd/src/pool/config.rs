//! Worker pool configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of concurrent workers
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Queue capacity - the primary backpressure mechanism
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Attempts per task inside a worker
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Seconds a published result stays in the cache
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: u64,

    /// Seconds a worker may sit on one task before it counts as stuck
    #[serde(default = "default_stuck_threshold_secs")]
    pub stuck_threshold_secs: u64,

    /// Seconds between health monitor passes
    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,
}

fn default_max_workers() -> usize {
    4
}

fn default_queue_size() -> usize {
    100
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_result_ttl_secs() -> u64 {
    3600
}

fn default_stuck_threshold_secs() -> u64 {
    300
}

fn default_health_interval_secs() -> u64 {
    10
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            queue_size: default_queue_size(),
            retry_attempts: default_retry_attempts(),
            result_ttl_secs: default_result_ttl_secs(),
            stuck_threshold_secs: default_stuck_threshold_secs(),
            health_interval_secs: default_health_interval_secs(),
        }
    }
}

impl PoolConfig {
    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }

    pub fn stuck_threshold(&self) -> Duration {
        Duration::from_secs(self.stuck_threshold_secs)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.queue_size, 100);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.result_ttl(), Duration::from_secs(3600));
        assert_eq!(config.stuck_threshold(), Duration::from_secs(300));
        assert_eq!(config.health_interval(), Duration::from_secs(10));
    }
}
