//! Broker-native task state
//!
//! A closed sum type over everything the broker can report about a task. The
//! status resolver consumes it exhaustively, so adding a variant is a breaking
//! change by design.

use serde::{Deserialize, Serialize};

use crate::campaign::CampaignStatus;
use crate::types::CampaignId;

// ----------------------------------------------------------------------------
// Progress Metrics
// ----------------------------------------------------------------------------

/// Snapshot published at each progress checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressMetrics {
    /// Recipients resolved so far (1-based position of the last one).
    pub current: u32,
    /// Total audience size.
    pub total: u32,
    pub sent_count: u32,
    pub failed_count: u32,
}

// ----------------------------------------------------------------------------
// Task Outcome
// ----------------------------------------------------------------------------

/// Aggregate result a finished task reports back through the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub campaign_id: CampaignId,
    pub status: CampaignStatus,
    pub total_recipients: u32,
    pub sent_count: u32,
    pub failed_count: u32,
}

// ----------------------------------------------------------------------------
// Task State
// ----------------------------------------------------------------------------

/// Broker-side lifecycle state of a task.
///
/// Unknown task ids report [`TaskState::Pending`]: the broker cannot
/// distinguish "never submitted" from "submitted but not yet picked up".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskState {
    /// Waiting in the queue (or unknown to the broker).
    Pending,
    /// Executing; carries the most recent checkpoint.
    Progress(ProgressMetrics),
    /// Finished successfully.
    Success(TaskOutcome),
    /// Permanently failed after retries were exhausted.
    Failure { error: String },
    /// An attempt failed and the task is waiting out its backoff delay.
    Retrying,
}

impl TaskState {
    /// Broker-native state name.
    pub fn name(&self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Progress(_) => "PROGRESS",
            TaskState::Success(_) => "SUCCESS",
            TaskState::Failure { .. } => "FAILURE",
            TaskState::Retrying => "RETRY",
        }
    }

    /// Whether the task can still change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success(_) | TaskState::Failure { .. })
    }
}

impl Default for TaskState {
    fn default() -> Self {
        TaskState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names_cover_broker_enum() {
        let metrics = ProgressMetrics {
            current: 10,
            total: 40,
            sent_count: 8,
            failed_count: 2,
        };
        let outcome = TaskOutcome {
            campaign_id: CampaignId::new(),
            status: CampaignStatus::Completed,
            total_recipients: 40,
            sent_count: 31,
            failed_count: 9,
        };

        assert_eq!(TaskState::Pending.name(), "PENDING");
        assert_eq!(TaskState::Progress(metrics).name(), "PROGRESS");
        assert_eq!(TaskState::Success(outcome).name(), "SUCCESS");
        assert_eq!(
            TaskState::Failure {
                error: "boom".into()
            }
            .name(),
            "FAILURE"
        );
        assert_eq!(TaskState::Retrying.name(), "RETRY");
    }

    #[test]
    fn test_terminality() {
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Retrying.is_terminal());
        assert!(TaskState::Failure {
            error: "x".into()
        }
        .is_terminal());
    }
}
