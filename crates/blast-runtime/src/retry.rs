//! Retry policy controller
//!
//! Wraps task execution in an explicit retry loop: attempt count and computed
//! backoff are first-class values here rather than side effects of
//! re-queueing. Only orchestration errors are retryable; per-recipient
//! delivery failures are recorded data and never reach this layer.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use blast_core::{
    BlastError, BlastResult, MessageBroker, OrchestrationError, RetryConfig, TaskId, TaskOutcome,
    TaskState,
};

// ----------------------------------------------------------------------------
// Retry Policy
// ----------------------------------------------------------------------------

/// Bounded exponential backoff with full jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Total attempts per task, first run included. Always at least 1.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Backoff ceiling after attempt `k` (1-based): `min(base * 2^(k-1), max)`.
    pub fn delay_before_jitter(&self, attempt: u32) -> Duration {
        let base_ms = self.config.base_delay.as_millis() as u64;
        let max_ms = self.config.max_delay.as_millis() as u64;
        // Clamp the exponent: beyond 16 doublings every realistic base delay
        // has saturated the ceiling anyway.
        let exponent = attempt.saturating_sub(1).min(16);
        let delay_ms = base_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay_ms.min(max_ms))
    }

    /// Jittered delay actually slept: uniform over [0, ceiling]. Spreads
    /// synchronized re-delivery storms across the window.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let ceiling = self.delay_before_jitter(attempt);
        if !self.config.jitter || ceiling.is_zero() {
            return ceiling;
        }
        let millis = rand::thread_rng().gen_range(0..=ceiling.as_millis() as u64);
        Duration::from_millis(millis)
    }
}

// ----------------------------------------------------------------------------
// Retry Controller
// ----------------------------------------------------------------------------

/// Drives task attempts under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            policy: RetryPolicy::new(config),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `attempt_fn` until it succeeds or attempts are exhausted. Between
    /// attempts the task is parked in `Retrying` for the jittered backoff
    /// window. On exhaustion the last error is preserved in the returned
    /// [`BlastError::RetryExhausted`].
    pub async fn execute<F, Fut>(
        &self,
        task_id: TaskId,
        broker: &dyn MessageBroker,
        mut attempt_fn: F,
    ) -> BlastResult<TaskOutcome>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<TaskOutcome, OrchestrationError>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;

        loop {
            match attempt_fn(attempt).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if attempt < max_attempts => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    warn!(
                        "Task {} attempt {}/{} failed: {}; retrying in {:?}",
                        task_id, attempt, max_attempts, err, delay
                    );
                    broker.set_state(task_id, TaskState::Retrying);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(BlastError::RetryExhausted {
                        attempts: attempt,
                        last_error: err.to_string(),
                    });
                }
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InProcessBroker;
    use blast_core::{CampaignId, CampaignStatus};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn outcome() -> TaskOutcome {
        TaskOutcome {
            campaign_id: CampaignId::new(),
            status: CampaignStatus::Completed,
            total_recipients: 0,
            sent_count: 0,
            failed_count: 0,
        }
    }

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            jitter: false,
        }
    }

    #[test]
    fn test_backoff_doubles_until_capped() {
        let policy = RetryPolicy::new(RetryConfig::default());
        assert_eq!(policy.delay_before_jitter(1), Duration::from_secs(60));
        assert_eq!(policy.delay_before_jitter(2), Duration::from_secs(120));
        assert_eq!(policy.delay_before_jitter(3), Duration::from_secs(240));
        assert_eq!(policy.delay_before_jitter(4), Duration::from_secs(480));
        // Cap reached
        assert_eq!(policy.delay_before_jitter(5), Duration::from_secs(600));
        assert_eq!(policy.delay_before_jitter(40), Duration::from_secs(600));
    }

    #[test]
    fn test_jitter_never_exceeds_ceiling() {
        let policy = RetryPolicy::new(RetryConfig::default());
        for attempt in 1..=6 {
            let ceiling = policy.delay_before_jitter(attempt);
            for _ in 0..100 {
                assert!(policy.delay_for_attempt(attempt) <= ceiling);
            }
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_runs_once() {
        let broker = InProcessBroker::new();
        let controller = RetryController::new(fast_config());
        let calls = AtomicU32::new(0);

        let result = controller
            .execute(TaskId::new(), &broker, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(outcome()) }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let broker = InProcessBroker::new();
        let task_id = TaskId::new();
        let controller = RetryController::new(fast_config());
        let calls = AtomicU32::new(0);

        let result = controller
            .execute(task_id, &broker, |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(OrchestrationError::execution("relay unreachable"))
                    } else {
                        Ok(outcome())
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempts_never_exceed_cap() {
        let broker = InProcessBroker::new();
        let task_id = TaskId::new();
        let controller = RetryController::new(fast_config());
        let calls = AtomicU32::new(0);

        let result = controller
            .execute(task_id, &broker, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(OrchestrationError::execution("relay unreachable")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(BlastError::RetryExhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("relay unreachable"));
            }
            other => panic!("Expected RetryExhausted, got {other:?}"),
        }
    }
}
