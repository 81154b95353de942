//! Session orchestration: enrollment, block extension, and the participant
//! flow around them.
//!
//! ## Allocation lock
//!
//! Allocation reads the per-trial counts, picks a block, then writes it.
//! Two unguarded allocations could both see the same low counts and hand out
//! the same least-covered trials. `Study` therefore keeps its balancer behind
//! a `tokio::sync::Mutex` and holds it from the count read until the block
//! is written, so allocations through one `Study` are serialized.
//!
//! The lock is advisory and process-local. Writers that bypass this `Study`
//! (a second process on a shared database) can still race, in which case
//! fairness is approximate: counts drift by at most the overlapping blocks
//! and converge again on later calls, since the log is append-only.
//!
//! Response and event logging never take the lock.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::StudyConfig;
use crate::coverage::{coverage_spread, CoverageBalancer};
use crate::export::{resolve_ai_confidence, ExportFormat, ExportPayload, ExportRow};
use crate::record::{
    AiEventRecord, AssignmentRecord, Condition, ParticipantId, ResponseRecord, TrialId, TrialRecord,
};
use crate::request::{EventRequest, StartRequest, SubmitRequest};
use crate::store::StudyStore;
use crate::{Error, Result};

/// Outcome of [`Study::start_session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStarted {
    /// Newly created participant.
    pub participant_id: ParticipantId,
    /// Condition the participant was enrolled in.
    pub condition: Condition,
    /// Number of trials in the first block.
    pub n_trials: usize,
}

/// Outcome of [`Study::extend_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionExtended {
    /// Number of trials added.
    pub added: usize,
}

/// The next unanswered trial of a participant's block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextTrial {
    /// Trial to present.
    pub trial_id: TrialId,
    /// Trial content.
    pub payload: Value,
}

/// AI suggestion shown for a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSuggestion {
    /// AI severity score, if the trial has one.
    pub ai_score: Option<i64>,
    /// AI justification, empty when absent.
    pub ai_justification: String,
    /// Confidence displayed with the suggestion.
    pub ai_confidence: f64,
}

/// A running study over a store.
pub struct Study<S> {
    store: S,
    config: StudyConfig,
    balancer: Mutex<CoverageBalancer>,
}

impl<S: StudyStore> Study<S> {
    /// Create a study with an entropy-seeded balancer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(store: S, config: StudyConfig) -> Result<Self> {
        Self::builder(store).config(config).build()
    }

    /// Create a study builder.
    #[must_use]
    pub fn builder(store: S) -> StudyBuilder<S> {
        StudyBuilder::new(store)
    }

    /// Underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Enroll a participant and assign the first block.
    ///
    /// The participant and its block are written together; on error nothing
    /// is written.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] for an unknown condition
    /// - [`Error::PoolEmpty`] if no trials exist
    pub async fn start_session(&self, request: StartRequest) -> Result<SessionStarted> {
        let condition = request.resolve_condition(self.config.default_condition)?;

        let mut balancer = self.balancer.lock().await;
        let counts = self.store.assignment_counts().await?;
        if counts.is_empty() {
            warn!("start refused: trial pool is empty");
            return Err(Error::PoolEmpty);
        }

        let chosen = balancer.select(&counts, self.config.block_size);
        let participant = self
            .store
            .create_participant(condition, request.metadata, &chosen)
            .await?;
        drop(balancer);

        let participant_id = participant.participant_id();
        debug!(%participant_id, trials = ?chosen, spread_before = ?coverage_spread(&counts), "block assigned");
        info!(%participant_id, %condition, n_trials = chosen.len(), "session started");

        Ok(SessionStarted {
            participant_id,
            condition,
            n_trials: chosen.len(),
        })
    }

    /// Assign another block to an existing participant, never repeating a
    /// trial the participant already holds.
    ///
    /// # Errors
    ///
    /// - [`Error::ParticipantNotFound`] for an unknown participant
    /// - [`Error::PoolEmpty`] if no trials exist
    /// - [`Error::PoolExhaustedForParticipant`] if the participant holds every trial
    pub async fn extend_session(&self, participant_id: ParticipantId) -> Result<SessionExtended> {
        self.require_participant(participant_id).await?;

        let mut balancer = self.balancer.lock().await;
        let assigned = self.store.assignments_for(participant_id).await?;
        let mut counts = self.store.assignment_counts().await?;
        if counts.is_empty() {
            warn!(%participant_id, "extend refused: trial pool is empty");
            return Err(Error::PoolEmpty);
        }
        for assignment in &assigned {
            counts.remove(&assignment.trial_id());
        }
        if counts.is_empty() {
            warn!(%participant_id, held = assigned.len(), "extend refused: pool exhausted for participant");
            return Err(Error::PoolExhaustedForParticipant { participant_id });
        }

        let start_idx = assigned
            .iter()
            .map(AssignmentRecord::order_idx)
            .max()
            .map_or(0, |max| max + 1);
        let chosen = balancer.select(&counts, self.config.block_size);
        self.store
            .append_assignments(AssignmentRecord::block(participant_id, start_idx, &chosen))
            .await?;
        drop(balancer);

        debug!(%participant_id, start_idx, trials = ?chosen, "block appended");
        info!(%participant_id, added = chosen.len(), "session extended");

        Ok(SessionExtended { added: chosen.len() })
    }

    /// The first trial, in block order, the participant has not answered.
    ///
    /// Returns `None` once every assigned trial has a response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParticipantNotFound`] for an unknown participant and
    /// [`Error::TrialNotFound`] if an assignment points at a missing trial.
    pub async fn next_trial(&self, participant_id: ParticipantId) -> Result<Option<NextTrial>> {
        self.require_participant(participant_id).await?;

        let answered: Vec<TrialId> = self
            .store
            .responses_for(participant_id)
            .await?
            .iter()
            .map(ResponseRecord::trial_id)
            .collect();
        let pending = self
            .store
            .assignments_for(participant_id)
            .await?
            .into_iter()
            .find(|a| !answered.contains(&a.trial_id()));

        let Some(assignment) = pending else {
            return Ok(None);
        };
        let trial = self
            .store
            .get_trial(assignment.trial_id())
            .await?
            .ok_or(Error::TrialNotFound(assignment.trial_id()))?;

        Ok(Some(NextTrial {
            trial_id: trial.trial_id(),
            payload: trial.payload().clone(),
        }))
    }

    /// Record an answer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for out-of-range values,
    /// [`Error::ParticipantNotFound`] or [`Error::TrialNotFound`] for unknown
    /// references.
    pub async fn submit_response(&self, submission: SubmitRequest) -> Result<ResponseRecord> {
        submission.validate()?;
        self.require_participant(submission.participant_id).await?;
        self.require_trial(submission.trial_id).await?;

        let response = self.store.record_response(submission).await?;
        debug!(
            participant_id = %response.participant_id(),
            trial_id = %response.trial_id(),
            rt_ms = response.rt_ms(),
            "response recorded"
        );
        Ok(response)
    }

    /// Record an AI-interaction event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank event type,
    /// [`Error::ParticipantNotFound`] or [`Error::TrialNotFound`] for unknown
    /// references.
    pub async fn log_event(&self, event: EventRequest) -> Result<AiEventRecord> {
        event.validate()?;
        self.require_participant(event.participant_id).await?;
        self.require_trial(event.trial_id).await?;

        let record = self.store.record_event(event).await?;
        debug!(participant_id = %record.participant_id(), event_type = record.event_type(), "ai event logged");
        Ok(record)
    }

    /// AI suggestion for a trial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrialNotFound`] for an unknown trial.
    pub async fn ai_suggestion(&self, trial_id: TrialId) -> Result<AiSuggestion> {
        let trial = self.require_trial(trial_id).await?;

        Ok(AiSuggestion {
            ai_score: trial.field("ai_severity_score").and_then(Value::as_i64),
            ai_justification: trial
                .field("ai_justification")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            ai_confidence: resolve_ai_confidence(None, &trial),
        })
    }

    /// Export every response joined with its participant and trial.
    ///
    /// Responses whose participant or trial no longer exists are skipped.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn export(&self, format: ExportFormat) -> Result<ExportPayload> {
        let responses = self.store.responses().await?;
        let mut rows = Vec::with_capacity(responses.len());

        for response in &responses {
            let Some(participant) = self.store.get_participant(response.participant_id()).await? else {
                continue;
            };
            let Some(trial) = self.store.get_trial(response.trial_id()).await? else {
                continue;
            };
            rows.push(ExportRow::from_records(response, &participant, &trial));
        }

        info!(%format, rows = rows.len(), "export rendered");
        Ok(ExportPayload::render(format, rows))
    }

    async fn require_participant(&self, participant_id: ParticipantId) -> Result<()> {
        match self.store.get_participant(participant_id).await? {
            Some(_) => Ok(()),
            None => Err(Error::ParticipantNotFound(participant_id)),
        }
    }

    async fn require_trial(&self, trial_id: TrialId) -> Result<TrialRecord> {
        self.store
            .get_trial(trial_id)
            .await?
            .ok_or(Error::TrialNotFound(trial_id))
    }
}

/// Study builder
pub struct StudyBuilder<S> {
    store: S,
    config: StudyConfig,
    seed: Option<u64>,
}

impl<S: StudyStore> StudyBuilder<S> {
    /// Create a builder with default configuration.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: StudyConfig::default(),
            seed: None,
        }
    }

    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: StudyConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the block size.
    #[must_use]
    pub const fn block_size(mut self, block_size: usize) -> Self {
        self.config.block_size = block_size;
        self
    }

    /// Fix the balancer seed (tests and simulation only).
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the study
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn build(self) -> Result<Study<S>> {
        self.config.validate()?;
        let balancer = self
            .seed
            .map_or_else(CoverageBalancer::new, CoverageBalancer::with_seed);
        Ok(Study {
            store: self.store,
            config: self.config,
            balancer: Mutex::new(balancer),
        })
    }
}
