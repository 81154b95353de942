//! Request contracts for the study's external operations
//!
//! Bodies arrive as JSON. Identifiers must be JSON integers; strings,
//! negatives and missing required fields are rejected with
//! [`Error::InvalidInput`] before any allocation work starts.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{Condition, ParticipantId, ParticipantMetadata, TrialId};
use crate::{Error, Result};

/// Parse a JSON request body.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the body is not valid JSON or does not
/// match the request shape.
pub fn parse<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::InvalidInput(format!("malformed request: {e}")))
}

/// Enroll a new participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    /// Requested condition; absent or blank uses the configured default.
    #[serde(default)]
    pub condition: Option<String>,
    /// External platform identifiers.
    #[serde(flatten)]
    pub metadata: ParticipantMetadata,
}

impl StartRequest {
    /// Request enrollment in a specific condition.
    #[must_use]
    pub fn with_condition(condition: Condition) -> Self {
        Self {
            condition: Some(condition.as_str().to_string()),
            metadata: ParticipantMetadata::default(),
        }
    }

    /// Resolve the requested condition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unrecognized condition name.
    pub fn resolve_condition(&self, default: Condition) -> Result<Condition> {
        match self.condition.as_deref().map(str::trim) {
            None | Some("") => Ok(default),
            Some(name) => name.parse(),
        }
    }
}

/// Assign another block to an existing participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendRequest {
    /// Participant to extend.
    pub participant_id: ParticipantId,
}

/// Submit an answer to one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Answering participant.
    pub participant_id: ParticipantId,
    /// Answered trial.
    pub trial_id: TrialId,
    /// Answer as sent by the client, normally `{"value": 1..5}`.
    #[serde(default)]
    pub answer: Option<Value>,
    /// Reaction time in milliseconds; absent means 0.
    #[serde(default)]
    pub rt_ms: Option<u64>,
    /// Whether the AI suggestion was revealed.
    #[serde(default)]
    pub revealed_ai: bool,
    /// AI confidence displayed to the participant.
    #[serde(default)]
    pub ai_confidence: Option<f64>,
}

impl SubmitRequest {
    /// Minimal submission with no answer payload.
    #[must_use]
    pub const fn new(participant_id: ParticipantId, trial_id: TrialId) -> Self {
        Self {
            participant_id,
            trial_id,
            answer: None,
            rt_ms: None,
            revealed_ai: false,
            ai_confidence: None,
        }
    }

    /// Attach an answer payload.
    #[must_use]
    pub fn with_answer(mut self, answer: Value) -> Self {
        self.answer = Some(answer);
        self
    }

    /// Attach a reaction time.
    #[must_use]
    pub const fn with_rt_ms(mut self, rt_ms: u64) -> Self {
        self.rt_ms = Some(rt_ms);
        self
    }

    /// Mark the AI suggestion as revealed, with the confidence shown.
    #[must_use]
    pub const fn with_revealed_ai(mut self, ai_confidence: Option<f64>) -> Self {
        self.revealed_ai = true;
        self.ai_confidence = ai_confidence;
        self
    }

    /// Reject values that cannot be stored as-is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `ai_confidence` is outside `0.0..=1.0`.
    pub fn validate(&self) -> Result<()> {
        match self.ai_confidence {
            Some(c) if !(0.0..=1.0).contains(&c) => Err(Error::InvalidInput(format!(
                "ai_confidence must be within 0..=1, got {c}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Log one AI-interaction event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRequest {
    /// Participant who triggered the event.
    pub participant_id: ParticipantId,
    /// Trial on screen.
    pub trial_id: TrialId,
    /// Event kind (`ai_shown`, `prompt`, `output`, `survey`, ...).
    pub event_type: String,
    /// Free-form event data.
    #[serde(default)]
    pub payload: Option<Value>,
}

impl EventRequest {
    /// Event without a payload.
    #[must_use]
    pub fn new(participant_id: ParticipantId, trial_id: TrialId, event_type: impl Into<String>) -> Self {
        Self {
            participant_id,
            trial_id,
            event_type: event_type.into(),
            payload: None,
        }
    }

    /// Attach event data.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Reject events without a type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `event_type` is blank.
    pub fn validate(&self) -> Result<()> {
        if self.event_type.trim().is_empty() {
            return Err(Error::InvalidInput("event_type must not be empty".to_string()));
        }
        Ok(())
    }
}
