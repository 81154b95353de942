//! Response Record - a participant's answer to one trial

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ParticipantId, TrialId};

/// Response Record represents one submitted answer.
///
/// The answer is kept as submitted (normally `{"value": 1..5}`); correctness
/// is scored offline against the trial's ground truth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseRecord {
    response_id: u64,
    participant_id: ParticipantId,
    trial_id: TrialId,
    answer: Option<Value>,
    rt_ms: u64,
    revealed_ai: bool,
    ai_confidence: Option<f64>,
    created_at: DateTime<Utc>,
}

impl ResponseRecord {
    /// Create a builder for a response record.
    #[must_use]
    pub fn builder(
        response_id: u64,
        participant_id: ParticipantId,
        trial_id: TrialId,
    ) -> ResponseRecordBuilder {
        ResponseRecordBuilder::new(response_id, participant_id, trial_id)
    }

    /// Get the response ID.
    #[must_use]
    pub const fn response_id(&self) -> u64 {
        self.response_id
    }

    /// Get the participant ID.
    #[must_use]
    pub const fn participant_id(&self) -> ParticipantId {
        self.participant_id
    }

    /// Get the trial ID.
    #[must_use]
    pub const fn trial_id(&self) -> TrialId {
        self.trial_id
    }

    /// Get the raw answer.
    #[must_use]
    pub const fn answer(&self) -> Option<&Value> {
        self.answer.as_ref()
    }

    /// The `value` field of an object answer.
    #[must_use]
    pub fn answer_value(&self) -> Option<&Value> {
        self.answer
            .as_ref()
            .and_then(Value::as_object)
            .and_then(|obj| obj.get("value"))
            .filter(|v| !v.is_null())
    }

    /// Get the reaction time in milliseconds.
    #[must_use]
    pub const fn rt_ms(&self) -> u64 {
        self.rt_ms
    }

    /// Whether the participant revealed the AI suggestion before answering.
    #[must_use]
    pub const fn revealed_ai(&self) -> bool {
        self.revealed_ai
    }

    /// AI confidence shown to the participant, if the client logged it.
    #[must_use]
    pub const fn ai_confidence(&self) -> Option<f64> {
        self.ai_confidence
    }

    /// Get the submission timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Builder for `ResponseRecord`.
#[derive(Debug)]
pub struct ResponseRecordBuilder {
    record: ResponseRecord,
}

impl ResponseRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(response_id: u64, participant_id: ParticipantId, trial_id: TrialId) -> Self {
        Self {
            record: ResponseRecord {
                response_id,
                participant_id,
                trial_id,
                answer: None,
                rt_ms: 0,
                revealed_ai: false,
                ai_confidence: None,
                created_at: Utc::now(),
            },
        }
    }

    /// Set the answer.
    #[must_use]
    pub fn answer(mut self, answer: Option<Value>) -> Self {
        self.record.answer = answer;
        self
    }

    /// Set the reaction time.
    #[must_use]
    pub const fn rt_ms(mut self, rt_ms: u64) -> Self {
        self.record.rt_ms = rt_ms;
        self
    }

    /// Set the AI-reveal flag.
    #[must_use]
    pub const fn revealed_ai(mut self, revealed_ai: bool) -> Self {
        self.record.revealed_ai = revealed_ai;
        self
    }

    /// Set the logged AI confidence.
    #[must_use]
    pub const fn ai_confidence(mut self, ai_confidence: Option<f64>) -> Self {
        self.record.ai_confidence = ai_confidence;
        self
    }

    /// Set a custom submission timestamp.
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.record.created_at = created_at;
        self
    }

    /// Build the `ResponseRecord`.
    #[must_use]
    pub fn build(self) -> ResponseRecord {
        self.record
    }
}
