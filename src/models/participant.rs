//! Participant (user or team registrant) and its status.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a participant (used in match slots and lookups).
pub type ParticipantId = Uuid;

/// Lifecycle of a participant within one tournament.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    #[default]
    Registered,
    CheckedIn,
    /// Placed in the bracket and still competing.
    Active,
    Eliminated,
    Withdrawn,
    Disqualified,
    /// Champion; only set once the tournament is completed.
    Winner,
}

impl ParticipantStatus {
    /// Registrants that may still be placed into a bracket.
    pub fn is_eligible(self) -> bool {
        matches!(self, ParticipantStatus::Registered | ParticipantStatus::CheckedIn)
    }

    /// Statuses nothing but the progression engine can leave.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ParticipantStatus::Eliminated
                | ParticipantStatus::Withdrawn
                | ParticipantStatus::Disqualified
                | ParticipantStatus::Winner
        )
    }
}

/// How a participant leaves the event through an external moderation action.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantExit {
    Withdrawn,
    Disqualified,
}

impl From<ParticipantExit> for ParticipantStatus {
    fn from(exit: ParticipantExit) -> Self {
        match exit {
            ParticipantExit::Withdrawn => ParticipantStatus::Withdrawn,
            ParticipantExit::Disqualified => ParticipantStatus::Disqualified,
        }
    }
}

/// A registrant in a tournament.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub status: ParticipantStatus,
    /// Seed supplied by the registry (used by `SeedingPolicy::Requested`).
    pub requested_seed: Option<u32>,
    /// Bracket seed (1-based) assigned when the bracket is built. None = not in the bracket.
    pub seed: Option<u32>,
    /// Elimination stage: higher means the participant lasted longer. Drives elimination placements.
    pub eliminated_stage: Option<u32>,
    /// Final placement, set on completion.
    pub placement: Option<u32>,
}

impl Participant {
    /// Create a new registrant. Other fields start empty.
    pub fn new(name: impl Into<String>, requested_seed: Option<u32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: ParticipantStatus::Registered,
            requested_seed,
            seed: None,
            eliminated_stage: None,
            placement: None,
        }
    }

    /// True once the participant has been placed in the bracket.
    pub fn in_bracket(&self) -> bool {
        self.seed.is_some()
    }

    /// Still able to play matches.
    pub fn is_active(&self) -> bool {
        self.status == ParticipantStatus::Active
    }

    /// Mark the participant as knocked out at the given stage. A withdrawn or disqualified
    /// participant keeps that status and only gets the stage.
    pub fn eliminate(&mut self, stage: u32) {
        if !self.has_left() {
            self.status = ParticipantStatus::Eliminated;
        }
        self.eliminated_stage = Some(stage);
    }

    /// Left the event through moderation.
    pub fn has_left(&self) -> bool {
        matches!(
            self.status,
            ParticipantStatus::Withdrawn | ParticipantStatus::Disqualified
        )
    }

    /// Undo an elimination (external result override).
    pub fn reinstate(&mut self) {
        self.status = ParticipantStatus::Active;
        self.eliminated_stage = None;
    }

    /// Bracket seed, or `u32::MAX` for participants outside the bracket. Used as the last tie-break.
    pub fn seed_key(&self) -> u32 {
        self.seed.unwrap_or(u32::MAX)
    }
}
