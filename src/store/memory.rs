//! In-memory study store.
//!
//! Data is lost on process restart. Trials, participants and the assignment
//! log share one `RwLock` so a participant and its block commit together;
//! responses and events are independent append-only logs in `DashMap`s.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::RwLock;

use super::StudyStore;
use crate::coverage::PoolCounts;
use crate::record::{
    AiEventRecord, AssignmentRecord, Condition, ParticipantId, ParticipantMetadata,
    ParticipantRecord, ResponseRecord, TrialId, TrialRecord, DEFAULT_SPLIT,
};
use crate::request::{EventRequest, SubmitRequest};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct Tables {
    trials: FxHashMap<TrialId, TrialRecord>,
    participants: FxHashMap<ParticipantId, ParticipantRecord>,
    assignments: Vec<AssignmentRecord>,
    last_trial_id: u64,
    last_participant_id: u64,
}

impl Tables {
    fn insert_trial(&mut self, payload: Value, ai_confidence: Option<f64>) -> TrialRecord {
        self.last_trial_id += 1;
        let split = payload
            .get("split")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SPLIT)
            .to_string();
        let mut builder = TrialRecord::builder(TrialId::new(self.last_trial_id), payload).split(split);
        if let Some(confidence) = ai_confidence {
            builder = builder.ai_confidence(confidence);
        }
        let trial = builder.build();
        self.trials.insert(trial.trial_id(), trial.clone());
        trial
    }

    fn ensure_trials_exist(&self, trial_ids: impl IntoIterator<Item = TrialId>) -> Result<()> {
        for trial_id in trial_ids {
            if !self.trials.contains_key(&trial_id) {
                return Err(Error::TrialNotFound(trial_id));
            }
        }
        Ok(())
    }

    fn assigned_len(&self, participant_id: ParticipantId) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.participant_id() == participant_id)
            .count()
    }
}

/// In-memory study store.
///
/// # Example
///
/// ```rust
/// use dilemma_study::store::{MemoryStudyStore, StudyStore};
/// use serde_json::json;
///
/// # async fn example() -> dilemma_study::Result<()> {
/// let store = MemoryStudyStore::with_trials([json!({"dilemma_text": "a"}), json!({"dilemma_text": "b"})]);
/// assert_eq!(store.trial_count().await?, 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStudyStore {
    tables: RwLock<Tables>,
    responses: DashMap<u64, ResponseRecord>,
    events: DashMap<u64, AiEventRecord>,
    last_response_id: AtomicU64,
    last_event_id: AtomicU64,
}

impl MemoryStudyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with trial payloads, numbered from 1.
    #[must_use]
    pub fn with_trials<I>(payloads: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut tables = Tables::default();
        for payload in payloads {
            tables.insert_trial(payload, None);
        }
        Self {
            tables: RwLock::new(tables),
            ..Self::default()
        }
    }

    /// Number of logged responses.
    #[must_use]
    pub fn response_count(&self) -> usize {
        self.responses.len()
    }

    /// Number of logged AI events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

impl StudyStore for MemoryStudyStore {
    async fn insert_trial(&self, payload: Value, ai_confidence: Option<f64>) -> Result<TrialRecord> {
        Ok(self.tables.write().await.insert_trial(payload, ai_confidence))
    }

    async fn get_trial(&self, trial_id: TrialId) -> Result<Option<TrialRecord>> {
        Ok(self.tables.read().await.trials.get(&trial_id).cloned())
    }

    async fn trial_count(&self) -> Result<usize> {
        Ok(self.tables.read().await.trials.len())
    }

    async fn assignment_counts(&self) -> Result<PoolCounts> {
        let tables = self.tables.read().await;
        let mut counts: PoolCounts = tables.trials.keys().map(|&id| (id, 0)).collect();
        for assignment in &tables.assignments {
            if let Some(count) = counts.get_mut(&assignment.trial_id()) {
                *count += 1;
            }
        }
        Ok(counts)
    }

    async fn assignments_for(&self, participant_id: ParticipantId) -> Result<Vec<AssignmentRecord>> {
        let tables = self.tables.read().await;
        let mut assignments: Vec<AssignmentRecord> = tables
            .assignments
            .iter()
            .filter(|a| a.participant_id() == participant_id)
            .copied()
            .collect();
        assignments.sort_by_key(AssignmentRecord::order_idx);
        Ok(assignments)
    }

    async fn create_participant(
        &self,
        condition: Condition,
        metadata: ParticipantMetadata,
        trial_ids: &[TrialId],
    ) -> Result<ParticipantRecord> {
        let mut tables = self.tables.write().await;
        tables.ensure_trials_exist(trial_ids.iter().copied())?;

        tables.last_participant_id += 1;
        let participant_id = ParticipantId::new(tables.last_participant_id);
        let participant = ParticipantRecord::builder(participant_id, condition)
            .metadata(metadata)
            .build();

        tables.participants.insert(participant_id, participant.clone());
        tables
            .assignments
            .extend(AssignmentRecord::block(participant_id, 0, trial_ids));
        Ok(participant)
    }

    async fn get_participant(&self, participant_id: ParticipantId) -> Result<Option<ParticipantRecord>> {
        Ok(self.tables.read().await.participants.get(&participant_id).cloned())
    }

    async fn append_assignments(&self, assignments: Vec<AssignmentRecord>) -> Result<()> {
        let Some(first) = assignments.first() else {
            return Ok(());
        };
        let participant_id = first.participant_id();

        let mut tables = self.tables.write().await;
        if !tables.participants.contains_key(&participant_id) {
            return Err(Error::ParticipantNotFound(participant_id));
        }
        tables.ensure_trials_exist(assignments.iter().map(AssignmentRecord::trial_id))?;

        let mut expected = tables.assigned_len(participant_id);
        for assignment in &assignments {
            let order_idx = assignment.order_idx() as usize;
            if assignment.participant_id() != participant_id || order_idx != expected {
                return Err(Error::StorageError(format!(
                    "assignment block for participant {participant_id} must continue at order_idx {expected}, got {order_idx}"
                )));
            }
            expected += 1;
        }

        tables.assignments.extend(assignments);
        Ok(())
    }

    async fn record_response(&self, submission: SubmitRequest) -> Result<ResponseRecord> {
        let response_id = self.last_response_id.fetch_add(1, Ordering::SeqCst) + 1;
        let response = ResponseRecord::builder(response_id, submission.participant_id, submission.trial_id)
            .answer(submission.answer)
            .rt_ms(submission.rt_ms.unwrap_or(0))
            .revealed_ai(submission.revealed_ai)
            .ai_confidence(submission.ai_confidence)
            .build();
        self.responses.insert(response_id, response.clone());
        Ok(response)
    }

    async fn responses(&self) -> Result<Vec<ResponseRecord>> {
        let mut responses: Vec<ResponseRecord> =
            self.responses.iter().map(|entry| entry.value().clone()).collect();
        responses.sort_by_key(ResponseRecord::response_id);
        Ok(responses)
    }

    async fn responses_for(&self, participant_id: ParticipantId) -> Result<Vec<ResponseRecord>> {
        let mut responses: Vec<ResponseRecord> = self
            .responses
            .iter()
            .filter(|entry| entry.value().participant_id() == participant_id)
            .map(|entry| entry.value().clone())
            .collect();
        responses.sort_by_key(ResponseRecord::response_id);
        Ok(responses)
    }

    async fn record_event(&self, event: EventRequest) -> Result<AiEventRecord> {
        let event_id = self.last_event_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = AiEventRecord::new(
            event_id,
            event.participant_id,
            event.trial_id,
            event.event_type,
            event.payload,
        );
        self.events.insert(event_id, record.clone());
        Ok(record)
    }

    async fn events_for(&self, participant_id: ParticipantId) -> Result<Vec<AiEventRecord>> {
        let mut events: Vec<AiEventRecord> = self
            .events
            .iter()
            .filter(|entry| entry.value().participant_id() == participant_id)
            .map(|entry| entry.value().clone())
            .collect();
        events.sort_by_key(AiEventRecord::event_id);
        Ok(events)
    }
}
