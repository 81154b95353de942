//! Study Records - the entities a study run produces
//!
//! ## Schema Overview
//!
//! ```text
//! TrialRecord (1) ──< AssignmentRecord (N) >── (1) ParticipantRecord
//!      │                                               │
//!      ├──< ResponseRecord (N) ────────────────────────┤
//!      └──< AiEventRecord (N) ─────────────────────────┘
//! ```
//!
//! Trials are immutable once seeded. Assignments are append-only and carry a
//! dense per-participant `order_idx`. Assignment counts per trial are always
//! derived from the assignment log, never stored on the trial.
//!
//! ## Usage
//!
//! ```rust
//! use dilemma_study::record::{AssignmentRecord, Condition, ParticipantId, TrialId};
//!
//! let assignment = AssignmentRecord::new(ParticipantId::new(1), TrialId::new(7), 0);
//! assert_eq!(assignment.order_idx(), 0);
//! assert_eq!("AI".parse::<Condition>().unwrap(), Condition::Ai);
//! ```

mod assignment_record;
mod event_record;
mod participant_record;
mod response_record;
mod trial_record;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use assignment_record::AssignmentRecord;
pub use event_record::AiEventRecord;
pub use participant_record::{ParticipantMetadata, ParticipantRecord, ParticipantRecordBuilder};
pub use response_record::{ResponseRecord, ResponseRecordBuilder};
pub use trial_record::{TrialRecord, TrialRecordBuilder, DEFAULT_SPLIT};

/// Unique, stable identifier of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialId(u64);

impl TrialId {
    /// Wrap a raw trial identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TrialId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Unique identifier of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(u64);

impl ParticipantId {
    /// Wrap a raw participant identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ParticipantId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Experimental condition a participant is enrolled in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// No AI suggestion is offered.
    #[default]
    Control,
    /// AI suggestion can be revealed on each trial.
    Ai,
}

impl Condition {
    /// Lowercase name as stored and exported.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Ai => "ai",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "control" => Ok(Self::Control),
            "ai" => Ok(Self::Ai),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown condition '{other}' (expected 'control' or 'ai')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_parse_case_insensitive() {
        assert_eq!("Control".parse::<Condition>().unwrap(), Condition::Control);
        assert_eq!(" ai ".parse::<Condition>().unwrap(), Condition::Ai);
        assert!("placebo".parse::<Condition>().is_err());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&TrialId::new(42)).unwrap();
        assert_eq!(json, "42");
        let id: ParticipantId = serde_json::from_str("7").unwrap();
        assert_eq!(id.get(), 7);
    }

    #[test]
    fn test_non_numeric_id_rejected() {
        assert!(serde_json::from_str::<TrialId>("\"abc\"").is_err());
        assert!(serde_json::from_str::<TrialId>("-1").is_err());
    }
}
