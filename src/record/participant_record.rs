//! Participant Record - one enrolled study subject

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Condition, ParticipantId};

/// External platform identifiers captured at enrollment.
///
/// Field names follow the crowdsourcing platform's camelCase query
/// parameters on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantMetadata {
    /// Platform worker identifier.
    #[serde(default)]
    pub worker_id: Option<String>,
    /// Platform assignment identifier.
    #[serde(default)]
    pub assignment_id: Option<String>,
    /// Platform HIT identifier.
    #[serde(default)]
    pub hit_id: Option<String>,
}

/// Participant Record represents one enrolled subject.
///
/// Created exactly once, together with the participant's first block of
/// assignments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantRecord {
    participant_id: ParticipantId,
    condition: Condition,
    metadata: ParticipantMetadata,
    created_at: DateTime<Utc>,
}

impl ParticipantRecord {
    /// Create a new participant record with the current timestamp.
    #[must_use]
    pub fn new(participant_id: ParticipantId, condition: Condition) -> Self {
        Self {
            participant_id,
            condition,
            metadata: ParticipantMetadata::default(),
            created_at: Utc::now(),
        }
    }

    /// Create a builder for constructing a participant record with optional fields.
    #[must_use]
    pub fn builder(participant_id: ParticipantId, condition: Condition) -> ParticipantRecordBuilder {
        ParticipantRecordBuilder::new(participant_id, condition)
    }

    /// Get the participant ID.
    #[must_use]
    pub const fn participant_id(&self) -> ParticipantId {
        self.participant_id
    }

    /// Get the experimental condition.
    #[must_use]
    pub const fn condition(&self) -> Condition {
        self.condition
    }

    /// Get the external platform metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ParticipantMetadata {
        &self.metadata
    }

    /// Get the enrollment timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Builder for `ParticipantRecord`.
#[derive(Debug)]
pub struct ParticipantRecordBuilder {
    participant_id: ParticipantId,
    condition: Condition,
    metadata: ParticipantMetadata,
    created_at: DateTime<Utc>,
}

impl ParticipantRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(participant_id: ParticipantId, condition: Condition) -> Self {
        Self {
            participant_id,
            condition,
            metadata: ParticipantMetadata::default(),
            created_at: Utc::now(),
        }
    }

    /// Set the external platform metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: ParticipantMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set a custom enrollment timestamp.
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the `ParticipantRecord`.
    #[must_use]
    pub fn build(self) -> ParticipantRecord {
        ParticipantRecord {
            participant_id: self.participant_id,
            condition: self.condition,
            metadata: self.metadata,
            created_at: self.created_at,
        }
    }
}
