//! Blast Runtime
//!
//! Wires the engine together: campaign registry, in-process broker, worker
//! pool, and the dispatcher/resolver handles applications use to talk to it.
//!
//! ```rust,no_run
//! use blast_core::{BlastConfig, Recipient};
//! use blast_runtime::{BlastRuntime, BulkSendRequest};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut runtime = BlastRuntime::new(BlastConfig::default());
//! runtime.start()?;
//!
//! let dispatcher = runtime.dispatcher();
//! let receipt = dispatcher
//!     .queue_bulk_send(BulkSendRequest {
//!         audience: vec![Recipient::new("ada@example.com")],
//!         subject: "Hello".into(),
//!         body: "World".into(),
//!         from_email: "noreply@example.com".into(),
//!         from_name: None,
//!     })
//!     .await?;
//!
//! let resolver = runtime.resolver();
//! let _status = resolver.campaign_status(receipt.campaign_id);
//!
//! runtime.stop().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use blast_core::{
    BlastConfig, BlastError, BlastResult, MessageBroker, OutcomeProvider, RandomOutcomes,
    SystemTimeSource, TimeSource,
};

use crate::broker::InProcessBroker;
use crate::dispatcher::Dispatcher;
use crate::managers::CampaignRegistry;
use crate::status::StatusResolver;
use crate::worker::WorkerTask;

// ----------------------------------------------------------------------------
// Blast Runtime
// ----------------------------------------------------------------------------

/// Owns the engine's shared state and the worker pool consuming its queue.
///
/// Campaign history is volatile: a restart loses the registry and every
/// broker-side task state. That is an explicit limitation, not an accident.
pub struct BlastRuntime {
    config: BlastConfig,
    registry: Arc<CampaignRegistry>,
    broker: Arc<InProcessBroker>,
    outcomes: Arc<dyn OutcomeProvider>,
    time_source: Arc<dyn TimeSource>,
    worker_handles: Vec<JoinHandle<BlastResult<()>>>,
    running: bool,
}

impl BlastRuntime {
    /// Create a runtime with production providers: random delivery outcomes
    /// and the system clock.
    pub fn new(config: BlastConfig) -> Self {
        Self::with_providers(
            config,
            Arc::new(RandomOutcomes::new()),
            Arc::new(SystemTimeSource::new()),
        )
    }

    /// Create a runtime with injected outcome and time providers.
    pub fn with_providers(
        config: BlastConfig,
        outcomes: Arc<dyn OutcomeProvider>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(CampaignRegistry::new()),
            broker: Arc::new(InProcessBroker::new()),
            outcomes,
            time_source,
            worker_handles: Vec::new(),
            running: false,
        }
    }

    /// Testing profile: fast retries, no pacing delays, injected outcomes.
    pub fn for_testing(outcomes: Arc<dyn OutcomeProvider>) -> Self {
        Self::with_providers(
            BlastConfig::testing(),
            outcomes,
            Arc::new(SystemTimeSource::new()),
        )
    }

    /// Validate configuration and spawn the worker pool.
    pub fn start(&mut self) -> BlastResult<()> {
        if self.running {
            return Err(BlastError::Configuration {
                reason: "Runtime already running".to_string(),
            });
        }
        self.config
            .validate()
            .map_err(|reason| BlastError::Configuration { reason })?;

        for worker_id in 0..self.config.workers.size {
            let broker: Arc<dyn MessageBroker> = self.broker.clone();
            let worker = WorkerTask::new(
                worker_id,
                broker,
                self.registry.clone(),
                self.outcomes.clone(),
                self.time_source.clone(),
                &self.config,
            );
            let handle = tokio::spawn(async move { worker.run().await });
            self.worker_handles.push(handle);
        }

        self.running = true;
        info!(
            "Blast runtime started with {} worker(s)",
            self.config.workers.size
        );
        Ok(())
    }

    /// Stop the worker pool. Registry and broker state stay readable.
    pub async fn stop(&mut self) {
        if !self.running {
            return;
        }

        for handle in self.worker_handles.drain(..) {
            handle.abort();
        }
        self.running = false;
        info!("Blast runtime stopped");
    }

    /// Handle for submitting work.
    pub fn dispatcher(&self) -> Dispatcher {
        let broker: Arc<dyn MessageBroker> = self.broker.clone();
        Dispatcher::new(self.registry.clone(), broker, self.time_source.clone())
    }

    /// Handle for status queries.
    pub fn resolver(&self) -> StatusResolver {
        let broker: Arc<dyn MessageBroker> = self.broker.clone();
        StatusResolver::new(self.registry.clone(), broker)
    }

    /// Shared campaign registry.
    pub fn registry(&self) -> Arc<CampaignRegistry> {
        self.registry.clone()
    }

    /// The in-process broker, e.g. for revoking not-yet-started tasks.
    pub fn broker(&self) -> Arc<InProcessBroker> {
        self.broker.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> &BlastConfig {
        &self.config
    }
}

impl Drop for BlastRuntime {
    fn drop(&mut self) {
        // Abort workers if the runtime is dropped while running
        for handle in &self.worker_handles {
            handle.abort();
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
