//! Status resolver
//!
//! Merges registry state with broker-native task state into a uniform
//! external view. Every read is a pure snapshot: safe to call at any
//! frequency, structured results for every condition (including not-found and
//! failure), and never an error to the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use blast_core::{
    Campaign, CampaignContent, CampaignId, CampaignStatus, CampaignSummary, MessageBroker,
    ProgressMetrics, RecipientResult, TaskId, TaskOutcome, TaskState, Timestamp,
};

use crate::managers::CampaignRegistry;

// ----------------------------------------------------------------------------
// Campaign Views
// ----------------------------------------------------------------------------

/// Full campaign view returned by [`StatusResolver::campaign_status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDetail {
    pub campaign_id: CampaignId,
    pub content: CampaignContent,
    pub status: CampaignStatus,
    pub total_recipients: u32,
    pub sent_count: u32,
    pub failed_count: u32,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: Vec<RecipientResult>,
}

impl CampaignDetail {
    fn from_campaign(campaign: Campaign) -> Self {
        Self {
            campaign_id: campaign.id,
            total_recipients: campaign.total_recipients(),
            content: campaign.content,
            status: campaign.status,
            sent_count: campaign.sent_count,
            failed_count: campaign.failed_count,
            created_at: campaign.created_at,
            scheduled_time: campaign.scheduled_time,
            completed_at: campaign.completed_at,
            failed_at: campaign.failed_at,
            task_id: campaign.task_id,
            error: campaign.error,
            results: campaign.results,
        }
    }
}

/// Result of a campaign status query: the campaign, or a structured
/// not-found payload. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CampaignStatusView {
    Found(Box<CampaignDetail>),
    NotFound {
        error: String,
        campaign_id: CampaignId,
    },
}

impl CampaignStatusView {
    pub fn is_found(&self) -> bool {
        matches!(self, CampaignStatusView::Found(_))
    }

    pub fn detail(&self) -> Option<&CampaignDetail> {
        match self {
            CampaignStatusView::Found(detail) => Some(detail.as_ref()),
            CampaignStatusView::NotFound { .. } => None,
        }
    }
}

/// Listing of every known campaign, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignList {
    pub total_campaigns: usize,
    pub campaigns: Vec<CampaignSummary>,
}

// ----------------------------------------------------------------------------
// Task Views
// ----------------------------------------------------------------------------

/// State-appropriate result carried by a task status report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskResultView {
    /// Pending and retry notices.
    Notice { status: String, message: String },
    /// Most recent checkpoint of an executing task.
    Progress {
        current: u32,
        total: u32,
        sent_count: u32,
        failed_count: u32,
        status: String,
    },
    /// Aggregate outcome of a finished task.
    Success(TaskOutcome),
    /// Permanent failure with the preserved last error.
    Failure { status: String, error: String },
}

/// Uniform external shape for task status queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusReport {
    pub task_id: TaskId,
    pub status: String,
    pub result: TaskResultView,
}

// ----------------------------------------------------------------------------
// Status Resolver
// ----------------------------------------------------------------------------

/// Read side of the engine. Cheap to clone; all handles share the same
/// registry and broker.
#[derive(Clone)]
pub struct StatusResolver {
    registry: Arc<CampaignRegistry>,
    broker: Arc<dyn MessageBroker>,
}

impl StatusResolver {
    pub fn new(registry: Arc<CampaignRegistry>, broker: Arc<dyn MessageBroker>) -> Self {
        Self { registry, broker }
    }

    /// Snapshot of one campaign. Unknown ids resolve to the structured
    /// not-found payload; repeated reads of a terminal campaign are
    /// identical.
    pub fn campaign_status(&self, campaign_id: CampaignId) -> CampaignStatusView {
        match self.registry.get(&campaign_id) {
            Some(campaign) => {
                CampaignStatusView::Found(Box::new(CampaignDetail::from_campaign(campaign)))
            }
            None => CampaignStatusView::NotFound {
                error: "Campaign not found".to_string(),
                campaign_id,
            },
        }
    }

    /// Summaries of every campaign, sorted by creation time descending with a
    /// deterministic tie-break.
    pub fn list_campaigns(&self) -> CampaignList {
        let campaigns = self.registry.summaries();
        CampaignList {
            total_campaigns: campaigns.len(),
            campaigns,
        }
    }

    /// Broker-native task state mapped to the uniform external shape. The
    /// mapping is total: every state the broker can report has a view, and
    /// unknown ids surface as pending.
    pub fn task_status(&self, task_id: TaskId) -> TaskStatusReport {
        let state = self.broker.state(task_id);
        let status = state.name().to_string();
        let result = match state {
            TaskState::Pending => TaskResultView::Notice {
                status: "pending".to_string(),
                message: "Task is waiting to be processed".to_string(),
            },
            TaskState::Progress(ProgressMetrics {
                current,
                total,
                sent_count,
                failed_count,
            }) => TaskResultView::Progress {
                current,
                total,
                sent_count,
                failed_count,
                status: "processing".to_string(),
            },
            TaskState::Success(outcome) => TaskResultView::Success(outcome),
            TaskState::Failure { error } => TaskResultView::Failure {
                status: "failed".to_string(),
                error,
            },
            TaskState::Retrying => TaskResultView::Notice {
                status: "retrying".to_string(),
                message: "Task is being retried after a failure".to_string(),
            },
        };

        TaskStatusReport {
            task_id,
            status,
            result,
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
    use blast_core::{Recipient, Timestamp};

    fn resolver() -> (StatusResolver, Arc<CampaignRegistry>, Arc<InProcessBroker>) {
        let registry = Arc::new(CampaignRegistry::new());
        let broker = Arc::new(InProcessBroker::new());
        (
            StatusResolver::new(registry.clone(), broker.clone()),
            registry,
            broker,
        )
    }

    #[test]
    fn test_unknown_campaign_yields_not_found_shape() {
        let (resolver, _registry, _broker) = resolver();
        let campaign_id = CampaignId::new();

        let view = resolver.campaign_status(campaign_id);
        assert!(!view.is_found());

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["error"], "Campaign not found");
        assert_eq!(json["campaign_id"], campaign_id.to_string());
    }

    #[test]
    fn test_found_campaign_merges_registry_fields() {
        let (resolver, registry, _broker) = resolver();
        let campaign = Campaign::queued(
            CampaignId::new(),
            CampaignContent::Email {
                subject: "Hello".into(),
                body: "World".into(),
                from_email: "noreply@example.com".into(),
                from_name: None,
            },
            vec![Recipient::new("a@example.com")],
            Timestamp::new(42),
        );
        let campaign_id = campaign.id;
        registry.insert(campaign);

        let view = resolver.campaign_status(campaign_id);
        let detail = view.detail().unwrap();
        assert_eq!(detail.status, CampaignStatus::Queued);
        assert_eq!(detail.total_recipients, 1);
        assert_eq!(detail.created_at, Timestamp::new(42));
    }

    #[test]
    fn test_task_state_mapping_is_total() {
        let (resolver, _registry, broker) = resolver();
        let task_id = TaskId::new();

        // Unknown id reports pending
        let report = resolver.task_status(task_id);
        assert_eq!(report.status, "PENDING");
        assert!(matches!(report.result, TaskResultView::Notice { .. }));

        broker.set_state(
            task_id,
            TaskState::Progress(ProgressMetrics {
                current: 5,
                total: 12,
                sent_count: 4,
                failed_count: 1,
            }),
        );
        let report = resolver.task_status(task_id);
        assert_eq!(report.status, "PROGRESS");
        match report.result {
            TaskResultView::Progress {
                current,
                sent_count,
                status,
                ..
            } => {
                assert_eq!(current, 5);
                assert_eq!(sent_count, 4);
                assert_eq!(status, "processing");
            }
            other => panic!("Expected progress view, got {other:?}"),
        }

        broker.set_state(task_id, TaskState::Retrying);
        let report = resolver.task_status(task_id);
        assert_eq!(report.status, "RETRY");

        broker.set_state(
            task_id,
            TaskState::Failure {
                error: "relay unreachable".into(),
            },
        );
        let report = resolver.task_status(task_id);
        assert_eq!(report.status, "FAILURE");
        match report.result {
            TaskResultView::Failure { error, .. } => assert_eq!(error, "relay unreachable"),
            other => panic!("Expected failure view, got {other:?}"),
        }
    }

    #[test]
    fn test_listing_empty_registry() {
        let (resolver, _registry, _broker) = resolver();
        let list = resolver.list_campaigns();
        assert_eq!(list.total_campaigns, 0);
        assert!(list.campaigns.is_empty());
    }
}
