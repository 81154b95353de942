//! Error types for dilemma-study
//!
//! Every condition a participant or operator can hit has its own variant, so
//! callers can tell "you're done" apart from "the study is misconfigured".

use thiserror::Error;

use crate::record::{ParticipantId, TrialId};

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// dilemma-study error types
#[derive(Error, Debug)]
pub enum Error {
    /// No trials exist in storage at all
    #[error("No trials available: the trial pool is empty\nSeed the study with trials before starting sessions")]
    PoolEmpty,

    /// Every trial is already assigned to this participant
    #[error("Trial pool exhausted for participant {participant_id}: every trial is already assigned")]
    PoolExhaustedForParticipant {
        /// Participant who has received the full pool
        participant_id: ParticipantId,
    },

    /// Participant lookup failed
    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    /// Trial lookup failed
    #[error("Trial not found: {0}")]
    TrialNotFound(TrialId),

    /// Malformed request (missing field, non-numeric identifier, bad format)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration rejected during validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    StorageError(String),

    /// JSON encode/decode error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error was caused by the caller's request rather than by
    /// the study's setup or storage.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ParticipantNotFound(_) | Self::TrialNotFound(_) | Self::InvalidInput(_)
        )
    }
}
