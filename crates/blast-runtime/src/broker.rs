//! In-process message broker
//!
//! A volatile, process-lifetime implementation of the broker interface: an
//! unbounded queue shared by the worker pool plus a concurrent task-state
//! table. Delivery is at-least-once; task ids are minted at enqueue time and
//! stay stable across retry attempts. Revocation is effective only for tasks
//! no worker has claimed yet.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tracing::debug;

use blast_core::{
    BrokerError, MessageBroker, TaskEnvelope, TaskId, TaskPayload, TaskState, Timestamp,
};

// ----------------------------------------------------------------------------
// In-Process Broker
// ----------------------------------------------------------------------------

/// Queue substrate backed by process-local channels and maps.
///
/// All state is lost on restart by design; campaign history durability is an
/// explicit non-goal of the engine.
pub struct InProcessBroker {
    queue_tx: mpsc::UnboundedSender<TaskEnvelope>,
    queue_rx: Mutex<mpsc::UnboundedReceiver<TaskEnvelope>>,
    states: DashMap<TaskId, TaskState>,
    revoked: DashMap<TaskId, ()>,
    inflight: DashMap<TaskId, ()>,
}

impl InProcessBroker {
    pub fn new() -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
            states: DashMap::new(),
            revoked: DashMap::new(),
            inflight: DashMap::new(),
        }
    }

    /// Number of tasks with a recorded state.
    pub fn tracked_tasks(&self) -> usize {
        self.states.len()
    }
}

impl Default for InProcessBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBroker for InProcessBroker {
    async fn enqueue(
        &self,
        payload: TaskPayload,
        not_before: Option<Timestamp>,
    ) -> Result<TaskId, BrokerError> {
        let task_id = TaskId::new();
        self.states.insert(task_id, TaskState::Pending);

        let campaign_id = payload.campaign_id();
        let envelope = TaskEnvelope {
            task_id,
            payload,
            not_before,
        };
        self.queue_tx
            .send(envelope)
            .map_err(|_| BrokerError::QueueClosed)?;

        debug!("Enqueued task {} for campaign {}", task_id, campaign_id);
        Ok(task_id)
    }

    async fn next_task(&self) -> Option<TaskEnvelope> {
        loop {
            // The receiver lock is the claim point: one worker dequeues at a
            // time, everything after the claim runs unlocked.
            let envelope = self.queue_rx.lock().await.recv().await?;

            if self.revoked.remove(&envelope.task_id).is_some() {
                debug!("Dropping task {} revoked before start", envelope.task_id);
                self.states.insert(
                    envelope.task_id,
                    TaskState::Failure {
                        error: "Task revoked before start".to_string(),
                    },
                );
                continue;
            }

            self.inflight.insert(envelope.task_id, ());
            return Some(envelope);
        }
    }

    fn ack(&self, task_id: TaskId) {
        self.inflight.remove(&task_id);
    }

    fn revoke(&self, task_id: TaskId) -> Result<(), BrokerError> {
        let started =
            self.inflight.contains_key(&task_id) || !matches!(self.state(task_id), TaskState::Pending);
        if started {
            return Err(BrokerError::AlreadyStarted { task_id });
        }
        self.revoked.insert(task_id, ());
        Ok(())
    }

    fn state(&self, task_id: TaskId) -> TaskState {
        self.states
            .get(&task_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn set_state(&self, task_id: TaskId, state: TaskState) {
        self.states.insert(task_id, state);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
