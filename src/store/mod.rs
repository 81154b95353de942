//! Study Store Module - the persistence boundary
//!
//! The allocator only needs two facts from storage: how many assignments each
//! trial has, and which trials a participant already holds. Everything else
//! here is plain append-only logging.
//!
//! - Trials are seeded once and never change
//! - Assignments, responses and AI events are append-only
//! - Assignment counts are aggregated from the log on every call
//!
//! # Example
//!
//! ```rust
//! use dilemma_study::store::{MemoryStudyStore, StudyStore};
//! use serde_json::json;
//!
//! # async fn example() -> dilemma_study::Result<()> {
//! let store = MemoryStudyStore::new();
//! let trial = store.insert_trial(json!({"dilemma_text": "..."}), None).await?;
//!
//! let counts = store.assignment_counts().await?;
//! assert_eq!(counts.get(&trial.trial_id()), Some(&0));
//! # Ok(())
//! # }
//! ```

mod memory;

pub use memory::MemoryStudyStore;

use std::future::Future;

use serde_json::Value;

use crate::coverage::PoolCounts;
use crate::record::{
    AiEventRecord, AssignmentRecord, Condition, ParticipantId, ParticipantMetadata,
    ParticipantRecord, ResponseRecord, TrialId, TrialRecord,
};
use crate::request::{EventRequest, SubmitRequest};
use crate::Result;

/// Storage backend for a study.
///
/// Multi-row writes (`create_participant`, `append_assignments`) must be
/// atomic: either every row becomes visible or none does.
pub trait StudyStore: Send + Sync {
    /// Seed one trial. The split label is read from the payload's `split`
    /// field, defaulting to `"all"`.
    fn insert_trial(
        &self,
        payload: Value,
        ai_confidence: Option<f64>,
    ) -> impl Future<Output = Result<TrialRecord>> + Send;

    /// Get a trial by ID.
    fn get_trial(&self, trial_id: TrialId) -> impl Future<Output = Result<Option<TrialRecord>>> + Send;

    /// Number of trials in the pool.
    fn trial_count(&self) -> impl Future<Output = Result<usize>> + Send;

    /// Every trial paired with the number of assignments referencing it,
    /// zero for trials nobody has received yet.
    fn assignment_counts(&self) -> impl Future<Output = Result<PoolCounts>> + Send;

    /// A participant's assignments ordered by `order_idx`.
    fn assignments_for(
        &self,
        participant_id: ParticipantId,
    ) -> impl Future<Output = Result<Vec<AssignmentRecord>>> + Send;

    /// Create a participant together with its first block, numbered from 0
    /// in the given order.
    fn create_participant(
        &self,
        condition: Condition,
        metadata: ParticipantMetadata,
        trial_ids: &[TrialId],
    ) -> impl Future<Output = Result<ParticipantRecord>> + Send;

    /// Get a participant by ID.
    fn get_participant(
        &self,
        participant_id: ParticipantId,
    ) -> impl Future<Output = Result<Option<ParticipantRecord>>> + Send;

    /// Append further assignments for an existing participant.
    ///
    /// The block must continue the participant's `order_idx` sequence
    /// without gaps.
    fn append_assignments(
        &self,
        assignments: Vec<AssignmentRecord>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Append a response.
    fn record_response(&self, submission: SubmitRequest)
        -> impl Future<Output = Result<ResponseRecord>> + Send;

    /// All responses ordered by response ID.
    fn responses(&self) -> impl Future<Output = Result<Vec<ResponseRecord>>> + Send;

    /// One participant's responses ordered by response ID.
    fn responses_for(
        &self,
        participant_id: ParticipantId,
    ) -> impl Future<Output = Result<Vec<ResponseRecord>>> + Send;

    /// Append an AI-interaction event.
    fn record_event(&self, event: EventRequest) -> impl Future<Output = Result<AiEventRecord>> + Send;

    /// One participant's AI events ordered by event ID.
    fn events_for(
        &self,
        participant_id: ParticipantId,
    ) -> impl Future<Output = Result<Vec<AiEventRecord>>> + Send;
}
