//! Worker task executor
//!
//! Consumes queued work from the broker, performs per-recipient delivery
//! attempts, publishes progress checkpoints, and writes terminal results.
//! Each claimed task is the single writer for its campaign; pollers read the
//! registry concurrently and may observe counts ahead of status within one
//! task's writes.
//!
//! Retry attempts resume from the last registry checkpoint: results already
//! flushed by a prior attempt stay recorded and the loop continues from the
//! first un-checkpointed recipient, so no recipient ever appears twice in the
//! result list.

use std::sync::Arc;

use tracing::{debug, error, info};

use blast_core::{
    BlastConfig, BlastError, BlastResult, Campaign, CampaignContent, CampaignStatus,
    CheckpointConfig, DeliveryOutcome, DeliveryTiming, MessageBroker, OrchestrationError,
    OutcomeProvider, ProgressMetrics, RecipientResult, SendPolicy, TaskEnvelope, TaskOutcome,
    TaskPayload, TaskState, TimeSource,
};

use crate::managers::CampaignRegistry;
use crate::retry::RetryController;

// ----------------------------------------------------------------------------
// Worker Task
// ----------------------------------------------------------------------------

/// One member of the worker pool.
pub struct WorkerTask {
    worker_id: usize,
    broker: Arc<dyn MessageBroker>,
    registry: Arc<CampaignRegistry>,
    outcomes: Arc<dyn OutcomeProvider>,
    time_source: Arc<dyn TimeSource>,
    checkpoint: CheckpointConfig,
    timing: DeliveryTiming,
    controller: RetryController,
}

impl WorkerTask {
    pub fn new(
        worker_id: usize,
        broker: Arc<dyn MessageBroker>,
        registry: Arc<CampaignRegistry>,
        outcomes: Arc<dyn OutcomeProvider>,
        time_source: Arc<dyn TimeSource>,
        config: &BlastConfig,
    ) -> Self {
        Self {
            worker_id,
            broker,
            registry,
            outcomes,
            time_source,
            checkpoint: config.checkpoint.clone(),
            timing: config.timing.clone(),
            controller: RetryController::new(config.retry.clone()),
        }
    }

    /// Main loop: claim, run, acknowledge, repeat until the queue closes.
    pub async fn run(&self) -> BlastResult<()> {
        info!("Worker {} starting", self.worker_id);

        while let Some(envelope) = self.broker.next_task().await {
            self.wait_until_due(&envelope).await;
            self.process(envelope).await;
        }

        info!("Worker {} stopped", self.worker_id);
        Ok(())
    }

    /// Scheduled tasks carry an earliest-start time; hold the claimed task
    /// until it is due.
    async fn wait_until_due(&self, envelope: &TaskEnvelope) {
        if let Some(not_before) = envelope.not_before {
            let now = self.time_source.now();
            if not_before > now {
                debug!(
                    "Worker {} holding task {} until its scheduled time",
                    self.worker_id, envelope.task_id
                );
                tokio::time::sleep(not_before.duration_since(now)).await;
            }
        }
    }

    /// Run one task to a terminal broker state. Orchestration errors stop at
    /// the retry controller; nothing propagates to the caller side.
    async fn process(&self, envelope: TaskEnvelope) {
        let task_id = envelope.task_id;
        debug!("Worker {} claimed task {}", self.worker_id, task_id);

        let worker = self;
        let result = self
            .controller
            .execute(task_id, self.broker.as_ref(), |attempt| {
                let envelope = envelope.clone();
                async move { worker.execute_attempt(&envelope, attempt).await }
            })
            .await;

        match result {
            Ok(outcome) => {
                info!(
                    "Task {} completed: {}/{} sent",
                    task_id, outcome.sent_count, outcome.total_recipients
                );
                self.broker.set_state(task_id, TaskState::Success(outcome));
            }
            Err(BlastError::RetryExhausted {
                attempts,
                last_error,
            }) => {
                error!(
                    "Task {} permanently failed after {} attempt(s): {}",
                    task_id, attempts, last_error
                );
                self.broker
                    .set_state(task_id, TaskState::Failure { error: last_error });
            }
            Err(other) => {
                error!("Task {} failed outside the retry loop: {}", task_id, other);
                self.broker.set_state(
                    task_id,
                    TaskState::Failure {
                        error: other.to_string(),
                    },
                );
            }
        }

        self.broker.ack(task_id);
    }

    /// One attempt of one task. On an orchestration error the campaign is
    /// marked failed before the error is handed back to the retry controller.
    async fn execute_attempt(
        &self,
        envelope: &TaskEnvelope,
        attempt: u32,
    ) -> Result<TaskOutcome, OrchestrationError> {
        match self.run_delivery_loop(envelope, attempt).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                let now = self.time_source.now();
                self.registry
                    .update(envelope.payload.campaign_id(), |campaign| {
                        campaign.fail(err.to_string(), now);
                    });
                Err(err)
            }
        }
    }

    async fn run_delivery_loop(
        &self,
        envelope: &TaskEnvelope,
        attempt: u32,
    ) -> Result<TaskOutcome, OrchestrationError> {
        let payload = &envelope.payload;
        let campaign_id = payload.campaign_id();
        let task_id = envelope.task_id;
        let started_at = self.time_source.now();

        // Enter processing, capturing the task correlation id. The insert arm
        // covers a campaign the accepting side never registered.
        self.registry.update_or_insert(
            campaign_id,
            |campaign| campaign.begin_processing(task_id),
            || {
                let mut campaign = Campaign::queued(
                    campaign_id,
                    content_from_payload(payload),
                    payload.recipients().to_vec(),
                    started_at,
                );
                campaign.begin_processing(task_id);
                campaign
            },
        );

        let (policy, interval, scheduled) = match payload {
            TaskPayload::BulkSend { .. } => {
                (SendPolicy::BULK_SEND, self.checkpoint.bulk_interval, false)
            }
            TaskPayload::ScheduledCampaign { .. } => (
                SendPolicy::SCHEDULED_SEND,
                self.checkpoint.scheduled_interval,
                true,
            ),
        };

        self.outcomes.open_session(campaign_id, attempt)?;

        if scheduled && !self.timing.scheduled_startup_delay.is_zero() {
            tokio::time::sleep(self.timing.scheduled_startup_delay).await;
        }

        // Resume point: everything flushed at a prior attempt's checkpoints
        // stays recorded.
        let (resume_from, mut sent_count, mut failed_count) = self
            .registry
            .get(&campaign_id)
            .map(|c| (c.results.len(), c.sent_count, c.failed_count))
            .unwrap_or((0, 0, 0));
        if attempt > 1 && resume_from > 0 {
            debug!(
                "Resuming campaign {} from recipient {} of {}",
                campaign_id,
                resume_from + 1,
                payload.recipients().len()
            );
        }

        let recipients = payload.recipients();
        let total = recipients.len() as u32;
        let mut pending: Vec<RecipientResult> = Vec::new();

        for (idx, recipient) in recipients.iter().enumerate().skip(resume_from) {
            let resolved_at = self.time_source.now();
            let result = match self.outcomes.sample(&policy, recipient) {
                DeliveryOutcome::Sent { delivery_id } => {
                    sent_count += 1;
                    RecipientResult::sent(recipient, delivery_id, resolved_at)
                }
                DeliveryOutcome::Failed { error } => {
                    failed_count += 1;
                    RecipientResult::failed(recipient, error, resolved_at)
                }
            };
            pending.push(result);

            let position = (idx + 1) as u32;
            if position % interval == 0 || position == total {
                self.registry.update(campaign_id, |campaign| {
                    campaign.record_results(pending.drain(..));
                });
                self.broker.set_state(
                    task_id,
                    TaskState::Progress(ProgressMetrics {
                        current: position,
                        total,
                        sent_count,
                        failed_count,
                    }),
                );
            }

            if scheduled && !self.timing.per_recipient_delay.is_zero() {
                tokio::time::sleep(self.timing.per_recipient_delay).await;
            }
        }

        let completed_at = self.time_source.now();
        self.registry
            .update(campaign_id, |campaign| campaign.complete(completed_at));

        Ok(TaskOutcome {
            campaign_id,
            status: CampaignStatus::Completed,
            total_recipients: total,
            sent_count,
            failed_count,
        })
    }
}

/// Rebuild the registry content definition from a task payload.
fn content_from_payload(payload: &TaskPayload) -> CampaignContent {
    match payload {
        TaskPayload::BulkSend {
            subject,
            body,
            from_email,
            from_name,
            ..
        } => CampaignContent::Email {
            subject: subject.clone(),
            body: body.clone(),
            from_email: from_email.clone(),
            from_name: from_name.clone(),
        },
        TaskPayload::ScheduledCampaign {
            message, channel, ..
        } => CampaignContent::ChannelMessage {
            message: message.clone(),
            channel: channel.clone(),
        },
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
