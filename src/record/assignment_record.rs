//! Assignment Record - one trial placed in a participant's block

use serde::{Deserialize, Serialize};

use super::{ParticipantId, TrialId};

/// Assignment Record places a trial at a position in a participant's block.
///
/// `order_idx` is dense and 0-based per participant, assigned at creation and
/// never changed. Many assignments may reference the same trial across
/// different participants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AssignmentRecord {
    participant_id: ParticipantId,
    trial_id: TrialId,
    order_idx: u32,
}

impl AssignmentRecord {
    /// Create a new assignment record.
    #[must_use]
    pub const fn new(participant_id: ParticipantId, trial_id: TrialId, order_idx: u32) -> Self {
        Self {
            participant_id,
            trial_id,
            order_idx,
        }
    }

    /// Build the assignments for a freshly selected block, numbering from
    /// `start_idx` in selection order.
    #[must_use]
    pub fn block(participant_id: ParticipantId, start_idx: u32, trial_ids: &[TrialId]) -> Vec<Self> {
        (start_idx..)
            .zip(trial_ids)
            .map(|(idx, &trial_id)| Self::new(participant_id, trial_id, idx))
            .collect()
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

    /// Get the presentation position.
    #[must_use]
    pub const fn order_idx(&self) -> u32 {
        self.order_idx
    }
}
