/// Preset policies for the external systems the image pipeline talks to
use crate::retry::RetryConfig;
use crate::timeout::TimeoutConfig;
use std::time::Duration;

/// Object storage connect at startup
///
/// - 5 attempts, 3s fixed delay
pub fn object_storage_connect() -> RetryConfig {
    RetryConfig::fixed(5, Duration::from_secs(3))
}

/// Database connect at startup
///
/// - 10 attempts, 3s fixed delay
pub fn database_connect() -> RetryConfig {
    RetryConfig::fixed(10, Duration::from_secs(3))
}

/// Metadata writes (upsert, delete)
///
/// - 3 attempts, 5s base delay, doubling
pub fn metadata_write() -> RetryConfig {
    RetryConfig::exponential(3, Duration::from_secs(5), 2.0)
}

/// Deadline around a single Kafka publish
pub fn bus_publish_timeout() -> TimeoutConfig {
    TimeoutConfig {
        duration: Duration::from_secs(30),
    }
}

/// Deadline for consumer workers to drain on shutdown
pub fn worker_shutdown_timeout() -> TimeoutConfig {
    TimeoutConfig {
        duration: Duration::from_secs(30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_storage_connect() {
        let config = object_storage_connect();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.delay_for(4), Duration::from_secs(3));
    }

    #[test]
    fn test_metadata_write() {
        let config = metadata_write();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.delay_for(0), Duration::from_secs(5));
        assert_eq!(config.delay_for(1), Duration::from_secs(10));
    }

    #[test]
    fn test_deadlines() {
        assert_eq!(bus_publish_timeout().duration, Duration::from_secs(30));
        assert_eq!(worker_shutdown_timeout().duration, Duration::from_secs(30));
    }
}
