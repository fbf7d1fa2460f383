//! Message broker collaborator interface
//!
//! The engine hands delivery work to a worker pool through this trait and
//! never shares a call stack with it. Implementations provide at-least-once
//! delivery with stable task correlation ids; deduplication stays a caller
//! concern. The runtime crate ships an in-process implementation; the same
//! trait is the seam for an external queue substrate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::BrokerError;
use crate::task_state::TaskState;
use crate::types::{CampaignId, Recipient, TaskId, Timestamp};

// ----------------------------------------------------------------------------
// Task Payload
// ----------------------------------------------------------------------------

/// Serializable work definition submitted to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Immediate bulk email send.
    BulkSend {
        campaign_id: CampaignId,
        subject: String,
        body: String,
        from_email: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_name: Option<String>,
        recipients: Vec<Recipient>,
    },
    /// Campaign registered to run at a future time.
    ScheduledCampaign {
        campaign_id: CampaignId,
        scheduled_time: Timestamp,
        message: String,
        channel: String,
        recipients: Vec<Recipient>,
    },
}

impl TaskPayload {
    /// Campaign this payload belongs to.
    pub fn campaign_id(&self) -> CampaignId {
        match self {
            TaskPayload::BulkSend { campaign_id, .. } => *campaign_id,
            TaskPayload::ScheduledCampaign { campaign_id, .. } => *campaign_id,
        }
    }

    /// Audience snapshot carried by the payload.
    pub fn recipients(&self) -> &[Recipient] {
        match self {
            TaskPayload::BulkSend { recipients, .. } => recipients,
            TaskPayload::ScheduledCampaign { recipients, .. } => recipients,
        }
    }
}

// ----------------------------------------------------------------------------
// Task Envelope
// ----------------------------------------------------------------------------

/// A queued unit of work as handed to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub task_id: TaskId,
    pub payload: TaskPayload,
    /// Earliest time the task may start; `None` means immediately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<Timestamp>,
}

// ----------------------------------------------------------------------------
// Message Broker Trait
// ----------------------------------------------------------------------------

/// Queue substrate the engine submits work to and queries state from.
///
/// Semantics required of implementations:
/// - `enqueue` assigns a [`TaskId`] that stays stable across retry attempts.
/// - `next_task` blocks until work is available and returns `None` only when
///   the queue is closed for good.
/// - `revoke` is effective only before a worker claims the task; revoking a
///   started task is refused. There is no mid-execution cancellation.
/// - `state` is total: unknown ids report [`TaskState::Pending`].
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Submit a payload, optionally deferred until `not_before`.
    async fn enqueue(
        &self,
        payload: TaskPayload,
        not_before: Option<Timestamp>,
    ) -> Result<TaskId, BrokerError>;

    /// Claim the next unit of work. Returns `None` when the queue is closed.
    async fn next_task(&self) -> Option<TaskEnvelope>;

    /// Acknowledge a claimed task as finished (successfully or not).
    fn ack(&self, task_id: TaskId);

    /// Cancel a task that has not started yet.
    fn revoke(&self, task_id: TaskId) -> Result<(), BrokerError>;

    /// Current state of a task. Total over all ids.
    fn state(&self, task_id: TaskId) -> TaskState;

    /// Record a state transition for a task.
    fn set_state(&self, task_id: TaskId, state: TaskState);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_accessors() {
        let campaign_id = CampaignId::new();
        let payload = TaskPayload::ScheduledCampaign {
            campaign_id,
            scheduled_time: Timestamp::new(9_000),
            message: "Doors open".to_string(),
            channel: "push".to_string(),
            recipients: vec![Recipient::new("a@example.com")],
        };
        assert_eq!(payload.campaign_id(), campaign_id);
        assert_eq!(payload.recipients().len(), 1);
    }

    #[test]
    fn test_payload_wire_shape() {
        let payload = TaskPayload::BulkSend {
            campaign_id: CampaignId::new(),
            subject: "Hi".into(),
            body: "There".into(),
            from_email: "noreply@example.com".into(),
            from_name: None,
            recipients: vec![],
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["task"], "bulk_send");
        assert!(value.get("from_name").is_none());
    }
}
