//! AI Event Record - telemetry from the AI suggestion UI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ParticipantId, TrialId};

/// AI Event Record captures one interaction with the AI suggestion panel
/// (`ai_shown`, `prompt`, `output`, `survey`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiEventRecord {
    event_id: u64,
    participant_id: ParticipantId,
    trial_id: TrialId,
    event_type: String,
    payload: Option<Value>,
    created_at: DateTime<Utc>,
}

impl AiEventRecord {
    /// Create a new event record with the current timestamp.
    #[must_use]
    pub fn new(
        event_id: u64,
        participant_id: ParticipantId,
        trial_id: TrialId,
        event_type: impl Into<String>,
        payload: Option<Value>,
    ) -> Self {
        Self {
            event_id,
            participant_id,
            trial_id,
            event_type: event_type.into(),
            payload,
            created_at: Utc::now(),
        }
    }

    /// Get the event ID.
    #[must_use]
    pub const fn event_id(&self) -> u64 {
        self.event_id
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

    /// Get the event type.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Get the event payload.
    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Get the timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
