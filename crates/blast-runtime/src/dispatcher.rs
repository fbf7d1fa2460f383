//! Dispatcher
//!
//! Accepts send requests, mints campaign identity, pre-registers the campaign
//! and submits the work to the broker. Submission is fire-and-forget: the
//! receipt returns immediately with correlation handles and callers observe
//! progress exclusively by polling the status resolver.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use blast_core::{
    BlastResult, Campaign, CampaignContent, CampaignId, CampaignStatus, MessageBroker, Recipient,
    TaskId, TaskPayload, TimeSource, Timestamp,
};

use crate::managers::CampaignRegistry;

// ----------------------------------------------------------------------------
// Requests
// ----------------------------------------------------------------------------

/// Immediate bulk email send request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSendRequest {
    pub audience: Vec<Recipient>,
    pub subject: String,
    pub body: String,
    pub from_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
}

/// Future-dated campaign request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub scheduled_time: Timestamp,
    pub message: String,
    pub channel: String,
    pub audience: Vec<Recipient>,
}

// ----------------------------------------------------------------------------
// Receipts
// ----------------------------------------------------------------------------

/// Correlation handles returned by [`Dispatcher::queue_bulk_send`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSendReceipt {
    pub campaign_id: CampaignId,
    pub task_id: TaskId,
    pub status: CampaignStatus,
    pub total_recipients: u32,
}

/// Correlation handles returned by [`Dispatcher::schedule_campaign`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleReceipt {
    pub campaign_id: CampaignId,
    pub task_id: TaskId,
    pub status: CampaignStatus,
    pub scheduled_time: Timestamp,
    pub total_recipients: u32,
    pub channel: String,
}

// ----------------------------------------------------------------------------
// Dispatcher
// ----------------------------------------------------------------------------

/// Accepting side of the engine. Cheap to clone; all handles share the same
/// registry and broker.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CampaignRegistry>,
    broker: Arc<dyn MessageBroker>,
    time_source: Arc<dyn TimeSource>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<CampaignRegistry>,
        broker: Arc<dyn MessageBroker>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            registry,
            broker,
            time_source,
        }
    }

    /// Queue an immediate bulk send. Pre-registers the campaign at `queued`
    /// so a poll racing the enqueue never sees not-found, then submits the
    /// payload. Returns without waiting for any delivery work.
    pub async fn queue_bulk_send(&self, request: BulkSendRequest) -> BlastResult<BulkSendReceipt> {
        let campaign_id = CampaignId::new();
        let now = self.time_source.now();

        // Audience validation stays a boundary concern; an empty audience is
        // accepted and completes with zero counts.
        if request.audience.is_empty() {
            warn!("Campaign {} accepted with an empty audience", campaign_id);
        }

        let content = CampaignContent::Email {
            subject: request.subject.clone(),
            body: request.body.clone(),
            from_email: request.from_email.clone(),
            from_name: request.from_name.clone(),
        };
        let campaign = Campaign::queued(campaign_id, content, request.audience.clone(), now);
        let total_recipients = campaign.total_recipients();
        self.registry.insert(campaign);

        let payload = TaskPayload::BulkSend {
            campaign_id,
            subject: request.subject,
            body: request.body,
            from_email: request.from_email,
            from_name: request.from_name,
            recipients: request.audience,
        };
        let task_id = self.broker.enqueue(payload, None).await?;

        info!(
            "Queued bulk send campaign {} ({} recipients) as task {}",
            campaign_id, total_recipients, task_id
        );
        Ok(BulkSendReceipt {
            campaign_id,
            task_id,
            status: CampaignStatus::Queued,
            total_recipients,
        })
    }

    /// Register a campaign for a future run. The registry entry exists at
    /// `scheduled` before the task id is known, so `campaign_status` works
    /// for a campaign the caller just created.
    pub async fn schedule_campaign(&self, request: ScheduleRequest) -> BlastResult<ScheduleReceipt> {
        let campaign_id = CampaignId::new();
        let now = self.time_source.now();

        if request.audience.is_empty() {
            warn!("Campaign {} scheduled with an empty audience", campaign_id);
        }

        let content = CampaignContent::ChannelMessage {
            message: request.message.clone(),
            channel: request.channel.clone(),
        };
        let campaign = Campaign::scheduled(
            campaign_id,
            content,
            request.audience.clone(),
            request.scheduled_time,
            now,
        );
        let total_recipients = campaign.total_recipients();
        self.registry.insert(campaign);

        let payload = TaskPayload::ScheduledCampaign {
            campaign_id,
            scheduled_time: request.scheduled_time,
            message: request.message,
            channel: request.channel.clone(),
            recipients: request.audience,
        };
        let task_id = self
            .broker
            .enqueue(payload, Some(request.scheduled_time))
            .await?;

        info!(
            "Scheduled campaign {} ({} recipients) on channel {} as task {}",
            campaign_id, total_recipients, request.channel, task_id
        );
        Ok(ScheduleReceipt {
            campaign_id,
            task_id,
            status: CampaignStatus::Scheduled,
            scheduled_time: request.scheduled_time,
            total_recipients,
            channel: request.channel,
        })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
