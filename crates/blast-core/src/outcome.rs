//! Delivery outcome policies and the injectable outcome provider
//!
//! Delivery is simulated: each recipient resolves to sent-or-failed under a
//! named policy. The two send paths carry deliberately different policies —
//! immediate bulk sends succeed at 75%, scheduled campaigns at 90% — and the
//! two are kept distinct rather than unified.
//!
//! The provider is a strategy seam: production uses [`RandomOutcomes`], tests
//! use [`ScriptedOutcomes`] for fully deterministic runs.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use rand::Rng;
use uuid::Uuid;

use crate::errors::OrchestrationError;
use crate::types::{CampaignId, Recipient};

// ----------------------------------------------------------------------------
// Send Policy
// ----------------------------------------------------------------------------

/// Named, fixed delivery policy for one send path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SendPolicy {
    pub name: &'static str,
    /// Probability that a recipient resolves to `Sent`.
    pub success_probability: f64,
    /// Prefix for minted delivery ids (`msg_...`, `sim_...`).
    pub delivery_id_prefix: &'static str,
    /// Fixed error code recorded for failed recipients.
    pub failure_code: &'static str,
}

impl SendPolicy {
    /// Immediate bulk email sends.
    pub const BULK_SEND: SendPolicy = SendPolicy {
        name: "bulk_send",
        success_probability: 0.75,
        delivery_id_prefix: "msg",
        failure_code: "Invalid email address",
    };

    /// Scheduled campaign sends.
    pub const SCHEDULED_SEND: SendPolicy = SendPolicy {
        name: "scheduled_send",
        success_probability: 0.90,
        delivery_id_prefix: "sim",
        failure_code: "Simulated delivery failure",
    };
}

// ----------------------------------------------------------------------------
// Delivery Outcome
// ----------------------------------------------------------------------------

/// Resolved outcome for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent { delivery_id: String },
    Failed { error: String },
}

// ----------------------------------------------------------------------------
// Outcome Provider
// ----------------------------------------------------------------------------

/// Strategy interface resolving per-recipient delivery outcomes.
pub trait OutcomeProvider: Send + Sync {
    /// Called once per task attempt before the recipient loop. A failure here
    /// is an orchestration error: the attempt aborts and is subject to the
    /// retry policy. The default session always opens.
    fn open_session(&self, _campaign_id: CampaignId, _attempt: u32) -> Result<(), OrchestrationError> {
        Ok(())
    }

    /// Resolve one recipient under the given policy. Never fails: a rejected
    /// delivery is data, not an error.
    fn sample(&self, policy: &SendPolicy, recipient: &Recipient) -> DeliveryOutcome;
}

// ----------------------------------------------------------------------------
// Random Outcomes (production)
// ----------------------------------------------------------------------------

/// Samples outcomes from the policy's success probability.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOutcomes;

impl RandomOutcomes {
    pub fn new() -> Self {
        Self
    }
}

impl OutcomeProvider for RandomOutcomes {
    fn sample(&self, policy: &SendPolicy, _recipient: &Recipient) -> DeliveryOutcome {
        if rand::thread_rng().gen_bool(policy.success_probability) {
            let suffix = Uuid::new_v4().simple().to_string();
            DeliveryOutcome::Sent {
                delivery_id: format!("{}_{}", policy.delivery_id_prefix, &suffix[..12]),
            }
        } else {
            DeliveryOutcome::Failed {
                error: policy.failure_code.to_string(),
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Scripted Outcomes (tests)
// ----------------------------------------------------------------------------

/// Deterministic provider: outcomes follow a fixed script, cycling when the
/// audience outruns it. Delivery ids are sequential.
#[derive(Debug, Default)]
pub struct ScriptedOutcomes {
    script: Vec<bool>,
    cursor: AtomicUsize,
    sequence: AtomicUsize,
    failing_sessions: AtomicU32,
}

impl ScriptedOutcomes {
    /// Outcomes follow `script` (`true` = sent), repeating from the start
    /// when exhausted.
    pub fn new(script: Vec<bool>) -> Self {
        Self {
            script,
            cursor: AtomicUsize::new(0),
            sequence: AtomicUsize::new(0),
            failing_sessions: AtomicU32::new(0),
        }
    }

    /// Every recipient resolves to `Sent`.
    pub fn all_sent() -> Self {
        Self::new(vec![true])
    }

    /// Fail the first `n` session openings with an orchestration error, then
    /// succeed. Drives the retry path deterministically.
    pub fn with_failing_sessions(mut self, n: u32) -> Self {
        self.failing_sessions = AtomicU32::new(n);
        self
    }
}

impl OutcomeProvider for ScriptedOutcomes {
    fn open_session(&self, campaign_id: CampaignId, attempt: u32) -> Result<(), OrchestrationError> {
        let claimed_failure = self
            .failing_sessions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if claimed_failure {
            return Err(OrchestrationError::execution(format!(
                "scripted session failure for campaign {campaign_id} (attempt {attempt})"
            )));
        }
        Ok(())
    }

    fn sample(&self, policy: &SendPolicy, _recipient: &Recipient) -> DeliveryOutcome {
        let step = if self.script.is_empty() {
            true
        } else {
            let i = self.cursor.fetch_add(1, Ordering::SeqCst);
            self.script[i % self.script.len()]
        };

        if step {
            let n = self.sequence.fetch_add(1, Ordering::SeqCst);
            DeliveryOutcome::Sent {
                delivery_id: format!("{}_{:012x}", policy.delivery_id_prefix, n),
            }
        } else {
            DeliveryOutcome::Failed {
                error: policy.failure_code.to_string(),
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
