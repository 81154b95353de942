//! Trial Record - one stimulus item in the shared pool

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TrialId;

/// Split label given to trials seeded without one.
pub const DEFAULT_SPLIT: &str = "all";

/// Trial Record represents one dilemma shown to participants.
///
/// The payload is opaque to the allocator. Export and the AI suggestion read
/// these well-known payload fields:
///
/// - `dilemma_text`
/// - `gt_severity_score`, `gt_justification`
/// - `ai_severity_score`, `ai_justification`, `ai_confidence`
///
/// Trials carry no assignment count; coverage is derived from the
/// assignment log at allocation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialRecord {
    trial_id: TrialId,
    payload: Value,
    split: String,
    ai_confidence: Option<f64>,
}

impl TrialRecord {
    /// Create a new trial record in the default split.
    #[must_use]
    pub fn new(trial_id: TrialId, payload: Value) -> Self {
        Self {
            trial_id,
            payload,
            split: DEFAULT_SPLIT.to_string(),
            ai_confidence: None,
        }
    }

    /// Create a builder for constructing a trial record with optional fields.
    #[must_use]
    pub fn builder(trial_id: TrialId, payload: Value) -> TrialRecordBuilder {
        TrialRecordBuilder::new(trial_id, payload)
    }

    /// Get the trial ID.
    #[must_use]
    pub const fn trial_id(&self) -> TrialId {
        self.trial_id
    }

    /// Get the opaque payload.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Get the split label.
    #[must_use]
    pub fn split(&self) -> &str {
        &self.split
    }

    /// Get the trial-level AI confidence, if one was patched in.
    #[must_use]
    pub const fn ai_confidence(&self) -> Option<f64> {
        self.ai_confidence
    }

    /// Look up a payload field by name.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key).filter(|v| !v.is_null())
    }

    /// Dilemma text with line breaks flattened to spaces.
    #[must_use]
    pub fn dilemma_text(&self) -> String {
        self.field("dilemma_text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .replace('\n', " ")
            .trim()
            .to_string()
    }

    /// AI confidence embedded in the payload, else the trial-level value.
    #[must_use]
    pub fn embedded_ai_confidence(&self) -> Option<f64> {
        self.field("ai_confidence")
            .and_then(Value::as_f64)
            .or(self.ai_confidence)
    }
}

/// Builder for `TrialRecord`.
#[derive(Debug)]
pub struct TrialRecordBuilder {
    trial_id: TrialId,
    payload: Value,
    split: Option<String>,
    ai_confidence: Option<f64>,
}

impl TrialRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub const fn new(trial_id: TrialId, payload: Value) -> Self {
        Self {
            trial_id,
            payload,
            split: None,
            ai_confidence: None,
        }
    }

    /// Set the split label.
    #[must_use]
    pub fn split(mut self, split: impl Into<String>) -> Self {
        self.split = Some(split.into());
        self
    }

    /// Set the trial-level AI confidence, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn ai_confidence(mut self, confidence: f64) -> Self {
        self.ai_confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// Build the `TrialRecord`.
    #[must_use]
    pub fn build(self) -> TrialRecord {
        TrialRecord {
            trial_id: self.trial_id,
            payload: self.payload,
            split: self.split.unwrap_or_else(|| DEFAULT_SPLIT.to_string()),
            ai_confidence: self.ai_confidence,
        }
    }
}
