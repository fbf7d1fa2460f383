//! Campaign data model
//!
//! A campaign is one unit of bulk messaging work: an immutable audience
//! snapshot, a content definition, and the lifecycle bookkeeping written by
//! the worker task that executes it. The campaign is created at dispatch time,
//! mutated exclusively by its executing task, and never explicitly destroyed
//! (process-lifetime bound; eviction is a productionization concern).
//!
//! Counting invariant: `sent_count + failed_count <= total_recipients` at all
//! times, with equality once the campaign reaches a terminal status.

use serde::{Deserialize, Serialize};

use crate::types::{CampaignId, Recipient, TaskId, Timestamp};

// ----------------------------------------------------------------------------
// Campaign Status
// ----------------------------------------------------------------------------

/// Lifecycle status of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    /// Accepted and enqueued, not yet picked up by a worker.
    Queued,
    /// Registered for a future run; the broker holds the task until due.
    Scheduled,
    /// A worker task is iterating the audience.
    Processing,
    /// All recipients resolved; counts are final.
    Completed,
    /// Orchestration failed and retries were exhausted (or are in between
    /// attempts). The last error is preserved on the campaign.
    Failed,
}

impl CampaignStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Failed)
    }

    /// Lowercase wire name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Queued => "queued",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Processing => "processing",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Failed => "failed",
        }
    }
}

impl core::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Campaign Content
// ----------------------------------------------------------------------------

/// What gets delivered to each recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CampaignContent {
    /// Email blast: subject/body pair with sender identity.
    Email {
        subject: String,
        body: String,
        from_email: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_name: Option<String>,
    },
    /// Channel message (sms, push, social, ...): free-form message text plus
    /// the channel name it targets.
    ChannelMessage { message: String, channel: String },
}

impl CampaignContent {
    /// Human-readable label used in summary projections: the email subject or
    /// the channel message text.
    pub fn label(&self) -> &str {
        match self {
            CampaignContent::Email { subject, .. } => subject,
            CampaignContent::ChannelMessage { message, .. } => message,
        }
    }

    /// Channel name, for channel-message campaigns.
    pub fn channel(&self) -> Option<&str> {
        match self {
            CampaignContent::Email { .. } => None,
            CampaignContent::ChannelMessage { channel, .. } => Some(channel),
        }
    }
}

// ----------------------------------------------------------------------------
// Per-Recipient Results
// ----------------------------------------------------------------------------

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientOutcome {
    Sent,
    Failed,
}

/// Recorded result for one recipient. Result order matches the audience
/// snapshot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientResult {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub outcome: RecipientOutcome,
    /// Present iff the outcome is `Sent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,
    /// Present iff the outcome is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: Timestamp,
}

impl RecipientResult {
    /// Record a successful delivery.
    pub fn sent(recipient: &Recipient, delivery_id: String, timestamp: Timestamp) -> Self {
        Self {
            address: recipient.address.clone(),
            name: recipient.name.clone(),
            outcome: RecipientOutcome::Sent,
            delivery_id: Some(delivery_id),
            error: None,
            timestamp,
        }
    }

    /// Record a failed delivery.
    pub fn failed(recipient: &Recipient, error: String, timestamp: Timestamp) -> Self {
        Self {
            address: recipient.address.clone(),
            name: recipient.name.clone(),
            outcome: RecipientOutcome::Failed,
            delivery_id: None,
            error: Some(error),
            timestamp,
        }
    }

    pub fn is_sent(&self) -> bool {
        self.outcome == RecipientOutcome::Sent
    }
}

// ----------------------------------------------------------------------------
// Campaign
// ----------------------------------------------------------------------------

/// A tracked bulk-messaging campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub content: CampaignContent,
    /// Immutable audience snapshot, in submission order.
    pub audience: Vec<Recipient>,
    pub status: CampaignStatus,
    pub sent_count: u32,
    pub failed_count: u32,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<Timestamp>,
    /// Broker task correlation id, captured when the worker task starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    /// Last orchestration error, preserved across retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Per-recipient results flushed so far, in audience order.
    pub results: Vec<RecipientResult>,
}

impl Campaign {
    /// Create a campaign accepted for immediate dispatch.
    pub fn queued(
        id: CampaignId,
        content: CampaignContent,
        audience: Vec<Recipient>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            content,
            audience,
            status: CampaignStatus::Queued,
            sent_count: 0,
            failed_count: 0,
            created_at: now,
            scheduled_time: None,
            completed_at: None,
            failed_at: None,
            task_id: None,
            error: None,
            results: Vec::new(),
        }
    }

    /// Create a campaign registered ahead of a future run.
    pub fn scheduled(
        id: CampaignId,
        content: CampaignContent,
        audience: Vec<Recipient>,
        scheduled_time: Timestamp,
        now: Timestamp,
    ) -> Self {
        Self {
            status: CampaignStatus::Scheduled,
            scheduled_time: Some(scheduled_time),
            ..Self::queued(id, content, audience, now)
        }
    }

    /// Audience size, fixed at creation.
    pub fn total_recipients(&self) -> u32 {
        self.audience.len() as u32
    }

    /// Transition into processing under the executing worker task, capturing
    /// the task correlation id. Clears any failure left by a prior attempt so
    /// a retry starts from a clean status.
    pub fn begin_processing(&mut self, task_id: TaskId) {
        self.status = CampaignStatus::Processing;
        if self.task_id.is_none() {
            self.task_id = Some(task_id);
        }
        self.error = None;
        self.failed_at = None;
    }

    /// Append freshly resolved results and refresh the running counts.
    pub fn record_results(&mut self, batch: impl IntoIterator<Item = RecipientResult>) {
        self.results.extend(batch);
        self.sent_count = self.results.iter().filter(|r| r.is_sent()).count() as u32;
        self.failed_count = self.results.len() as u32 - self.sent_count;
    }

    /// Terminal success: counts are final and the completion time is stamped.
    pub fn complete(&mut self, now: Timestamp) {
        self.status = CampaignStatus::Completed;
        self.completed_at = Some(now);
    }

    /// Terminal (or between-retries) failure with the orchestration error.
    pub fn fail(&mut self, error: impl Into<String>, now: Timestamp) {
        self.status = CampaignStatus::Failed;
        self.error = Some(error.into());
        self.failed_at = Some(now);
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Counting invariant check. Holds at all times; equality is additionally
    /// required once the campaign completes.
    pub fn counts_consistent(&self) -> bool {
        let sum = self.sent_count + self.failed_count;
        if self.status == CampaignStatus::Completed {
            sum == self.total_recipients()
        } else {
            sum <= self.total_recipients()
        }
    }

    /// Summary projection for listings.
    pub fn summary(&self) -> CampaignSummary {
        CampaignSummary {
            campaign_id: self.id,
            subject: self.content.label().to_string(),
            channel: self.content.channel().map(str::to_string),
            total_recipients: self.total_recipients(),
            sent_count: self.sent_count,
            failed_count: self.failed_count,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

// ----------------------------------------------------------------------------
// Summary Projection
// ----------------------------------------------------------------------------

/// Compact campaign view returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub campaign_id: CampaignId,
    /// Email subject, or the message text for channel campaigns.
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub total_recipients: u32,
    pub sent_count: u32,
    pub failed_count: u32,
    pub status: CampaignStatus,
    pub created_at: Timestamp,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn email_content() -> CampaignContent {
        CampaignContent::Email {
            subject: "Launch".to_string(),
            body: "We are live.".to_string(),
            from_email: "noreply@example.com".to_string(),
            from_name: Some("Example".to_string()),
        }
    }

    fn audience(n: usize) -> Vec<Recipient> {
        (0..n)
            .map(|i| Recipient::new(format!("user{i}@example.com")))
            .collect()
    }

    #[test]
    fn test_lifecycle_queued_to_completed() {
        let id = CampaignId::new();
        let mut campaign = Campaign::queued(id, email_content(), audience(3), Timestamp::new(10));
        assert_eq!(campaign.status, CampaignStatus::Queued);
        assert_eq!(campaign.total_recipients(), 3);
        assert!(campaign.counts_consistent());

        let task_id = TaskId::new();
        campaign.begin_processing(task_id);
        assert_eq!(campaign.status, CampaignStatus::Processing);
        assert_eq!(campaign.task_id, Some(task_id));

        let results: Vec<_> = campaign
            .audience
            .clone()
            .iter()
            .enumerate()
            .map(|(i, r)| {
                if i == 1 {
                    RecipientResult::failed(r, "Invalid email address".into(), Timestamp::new(30))
                } else {
                    RecipientResult::sent(r, format!("msg_{i:012x}"), Timestamp::new(30))
                }
            })
            .collect();
        campaign.record_results(results);
        campaign.complete(Timestamp::new(40));

        assert_eq!(campaign.sent_count, 2);
        assert_eq!(campaign.failed_count, 1);
        assert!(campaign.is_terminal());
        assert!(campaign.counts_consistent());
        assert_eq!(campaign.completed_at, Some(Timestamp::new(40)));
    }

    #[test]
    fn test_begin_processing_clears_prior_failure() {
        let mut campaign = Campaign::queued(
            CampaignId::new(),
            email_content(),
            audience(2),
            Timestamp::new(0),
        );
        let task_id = TaskId::new();
        campaign.begin_processing(task_id);
        campaign.fail("relay unreachable", Timestamp::new(2));
        assert_eq!(campaign.status, CampaignStatus::Failed);
        assert!(campaign.error.is_some());

        // Retry attempt re-enters processing without losing the task id
        campaign.begin_processing(TaskId::new());
        assert_eq!(campaign.status, CampaignStatus::Processing);
        assert_eq!(campaign.task_id, Some(task_id));
        assert!(campaign.error.is_none());
        assert!(campaign.failed_at.is_none());
    }

    #[test]
    fn test_scheduled_campaign_carries_schedule() {
        let content = CampaignContent::ChannelMessage {
            message: "Flash sale".to_string(),
            channel: "sms".to_string(),
        };
        let campaign = Campaign::scheduled(
            CampaignId::new(),
            content,
            audience(5),
            Timestamp::new(5_000),
            Timestamp::new(1_000),
        );
        assert_eq!(campaign.status, CampaignStatus::Scheduled);
        assert_eq!(campaign.scheduled_time, Some(Timestamp::new(5_000)));

        let summary = campaign.summary();
        assert_eq!(summary.subject, "Flash sale");
        assert_eq!(summary.channel.as_deref(), Some("sms"));
        assert_eq!(summary.total_recipients, 5);
    }

    #[test]
    fn test_result_field_presence_follows_outcome() {
        let recipient = Recipient::named("ada@example.com", "Ada");
        let sent = RecipientResult::sent(&recipient, "msg_0000deadbeef".into(), Timestamp::new(1));
        assert!(sent.delivery_id.is_some());
        assert!(sent.error.is_none());

        let failed =
            RecipientResult::failed(&recipient, "Invalid email address".into(), Timestamp::new(1));
        assert!(failed.delivery_id.is_none());
        assert_eq!(failed.error.as_deref(), Some("Invalid email address"));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&CampaignStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        assert_eq!(CampaignStatus::Scheduled.to_string(), "scheduled");
    }
}
