//! Centralized Configuration Management
//!
//! Consolidates the knobs used throughout the Blast engine into one
//! configuration surface with validated defaults and a testing profile.

use core::time::Duration;

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Worker Pool Configuration
// ----------------------------------------------------------------------------

/// Configuration for the worker pool consuming the broker queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Number of concurrent worker tasks.
    pub size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self { size: 4 }
    }
}

// ----------------------------------------------------------------------------
// Retry Configuration
// ----------------------------------------------------------------------------

/// Bounded exponential backoff applied to orchestration failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per task, first run included.
    pub max_attempts: u32,
    /// Backoff base: delay before jitter for the first retry.
    pub base_delay: Duration,
    /// Ceiling on the computed backoff delay.
    pub max_delay: Duration,
    /// Randomize each delay to avoid synchronized re-delivery storms.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,                        // 3 total attempts per task
            base_delay: Duration::from_secs(60),    // 1 minute
            max_delay: Duration::from_secs(600),    // capped at 10 minutes
            jitter: true,
        }
    }
}

// ----------------------------------------------------------------------------
// Checkpoint Configuration
// ----------------------------------------------------------------------------

/// Progress checkpoint cadence, in recipients. A checkpoint is always
/// published on the final recipient regardless of the interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Interval for immediate bulk sends.
    pub bulk_interval: u32,
    /// Interval for scheduled campaign sends.
    pub scheduled_interval: u32,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            bulk_interval: 10,     // every 10 recipients
            scheduled_interval: 5, // scheduled runs report more often
        }
    }
}

// ----------------------------------------------------------------------------
// Delivery Timing
// ----------------------------------------------------------------------------

/// Pacing of simulated delivery work on the scheduled path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryTiming {
    /// Fixed preparation delay before a scheduled run iterates its audience.
    pub scheduled_startup_delay: Duration,
    /// Simulated per-recipient processing time for scheduled runs.
    pub per_recipient_delay: Duration,
}

impl Default for DeliveryTiming {
    fn default() -> Self {
        Self {
            scheduled_startup_delay: Duration::from_secs(2),
            per_recipient_delay: Duration::from_millis(100),
        }
    }
}

impl DeliveryTiming {
    /// Zeroed delays for tests.
    pub fn immediate() -> Self {
        Self {
            scheduled_startup_delay: Duration::ZERO,
            per_recipient_delay: Duration::ZERO,
        }
    }
}

// ----------------------------------------------------------------------------
// Engine Configuration
// ----------------------------------------------------------------------------

/// Top-level configuration for the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlastConfig {
    pub workers: WorkerPoolConfig,
    pub retry: RetryConfig,
    pub checkpoint: CheckpointConfig,
    pub timing: DeliveryTiming,
}

impl BlastConfig {
    /// Profile for tests: small pool, no pacing delays, millisecond backoff
    /// without jitter so retry timing stays predictable.
    pub fn testing() -> Self {
        Self {
            workers: WorkerPoolConfig { size: 2 },
            retry: RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
                jitter: false,
            },
            checkpoint: CheckpointConfig::default(),
            timing: DeliveryTiming::immediate(),
        }
    }

    /// Validate invariants across the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.workers.size == 0 {
            return Err("worker pool size must be at least 1".to_string());
        }
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be at least 1".to_string());
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err("retry.base_delay must not exceed retry.max_delay".to_string());
        }
        if self.checkpoint.bulk_interval == 0 || self.checkpoint.scheduled_interval == 0 {
            return Err("checkpoint intervals must be at least 1".to_string());
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = BlastConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_secs(60));
        assert_eq!(config.retry.max_delay, Duration::from_secs(600));
        assert_eq!(config.checkpoint.bulk_interval, 10);
        assert_eq!(config.checkpoint.scheduled_interval, 5);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = BlastConfig::default();
        config.workers.size = 0;
        assert!(config.validate().is_err());

        let mut config = BlastConfig::default();
        config.checkpoint.scheduled_interval = 0;
        assert!(config.validate().is_err());

        let mut config = BlastConfig::default();
        config.retry.base_delay = Duration::from_secs(900);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_testing_profile_is_fast() {
        let config = BlastConfig::testing();
        assert!(config.validate().is_ok());
        assert_eq!(config.timing.per_recipient_delay, Duration::ZERO);
        assert!(!config.retry.jitter);
    }
}
