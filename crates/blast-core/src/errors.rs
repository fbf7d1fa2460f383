//! Error types for the Blast engine
//!
//! Specific error enums per concern, unified under [`BlastError`]. Read
//! operations never surface these to callers: not-found and failure conditions
//! are returned as structured data by the status resolver, and orchestration
//! failures propagate only as far as the retry controller.

use crate::types::TaskId;

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Errors raised by a message broker implementation
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    #[error("Task queue is closed")]
    QueueClosed,
    #[error("Task {task_id} has already started; revocation is only effective before start")]
    AlreadyStarted { task_id: TaskId },
}

/// Failures raised outside the per-recipient delivery loop.
///
/// These are the retryable class: the whole task attempt is re-run under the
/// retry policy. Per-recipient delivery failures are recorded as results and
/// are deliberately NOT represented here.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Task execution failed: {reason}")]
    Execution { reason: String },
}

impl OrchestrationError {
    /// Convenience constructor for the common case.
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Unified Error Type
// ----------------------------------------------------------------------------

/// Top-level error type for the Blast engine
#[derive(Debug, thiserror::Error)]
pub enum BlastError {
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Orchestration error: {0}")]
    Orchestration(#[from] OrchestrationError),

    #[error("Retry attempts exhausted after {attempts} attempt(s): {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },

    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },
}

pub type BlastResult<T> = Result<T, BlastError>;
