//! Blast Runtime Engine
//!
//! This crate contains the engine for the Blast bulk-messaging campaign
//! system, including:
//! - `BlastRuntime`: the orchestrator wiring registry, broker, and workers
//! - `Dispatcher`: fire-and-forget campaign submission
//! - `WorkerTask`: per-recipient delivery with checkpoints and retries
//! - `StatusResolver`: uniform campaign/task status reads
//!
//! This is the "engine"; `blast-core` provides the stable domain definitions
//! it is built on.

pub mod broker;
pub mod dispatcher;
pub mod managers;
pub mod retry;
mod runtime;
pub mod status;
pub mod worker;

pub use broker::InProcessBroker;
pub use dispatcher::{
    BulkSendReceipt, BulkSendRequest, Dispatcher, ScheduleReceipt, ScheduleRequest,
};
pub use managers::CampaignRegistry;
pub use retry::{RetryController, RetryPolicy};
pub use runtime::BlastRuntime;
pub use status::{
    CampaignDetail, CampaignList, CampaignStatusView, StatusResolver, TaskResultView,
    TaskStatusReport,
};
pub use worker::WorkerTask;

// Re-export core types for convenience
pub use blast_core::{
    BlastConfig, BlastError, BlastResult, Campaign, CampaignContent, CampaignId, CampaignStatus,
    CampaignSummary, MessageBroker, OutcomeProvider, ProgressMetrics, RandomOutcomes, Recipient,
    RecipientOutcome, RecipientResult, ScriptedOutcomes, SendPolicy, SystemTimeSource, TaskEnvelope,
    TaskId, TaskOutcome, TaskPayload, TaskState, TimeSource, Timestamp,
};
