//! Match, its two participant slots, and the (side, round, sequence) key bracket edges are computed from.

use crate::models::participant::ParticipantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// Which part of the event a match belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketSide {
    Winners,
    Losers,
    GrandFinal,
    /// Round robin, Swiss and league matches.
    Pool,
}

/// Position of a match in the bracket. Feed targets are pure functions of this key.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MatchKey {
    pub side: BracketSide,
    /// 1-based round within the side.
    pub round: u32,
    /// 0-based position within the round.
    pub sequence: u32,
}

impl MatchKey {
    pub fn new(side: BracketSide, round: u32, sequence: u32) -> Self {
        Self {
            side,
            round,
            sequence,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Waiting on at least one feeder match.
    #[default]
    Pending,
    Ready,
    InProgress,
    Completed,
    Canceled,
    Void,
}

impl MatchStatus {
    /// Completed, canceled and void are absorbing.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MatchStatus::Completed | MatchStatus::Canceled | MatchStatus::Void
        )
    }

    /// Matches that have not begun; the only state a dependent match may be in for a result override.
    pub fn is_unstarted(self) -> bool {
        matches!(self, MatchStatus::Pending | MatchStatus::Ready)
    }
}

/// Who submitted a result.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultSource {
    User,
    /// Third-party confirmation (e.g. a game API match id); may override a completed result.
    ExternalValidator,
}

/// Occupancy of one side of a match.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "state", content = "participant_id")]
pub enum SlotEntrant {
    /// Feeder match not resolved yet.
    #[default]
    Awaiting,
    Filled(ParticipantId),
    /// Feeder produced nobody (bye, double withdrawal, canceled branch).
    Vacant,
}

impl SlotEntrant {
    pub fn participant(self) -> Option<ParticipantId> {
        match self {
            SlotEntrant::Filled(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_settled(self) -> bool {
        self != SlotEntrant::Awaiting
    }
}

/// Link between a match and a participant: seed and score.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MatchSlot {
    pub entrant: SlotEntrant,
    pub seed: Option<u32>,
    pub score: Option<u32>,
}

impl MatchSlot {
    pub fn awaiting() -> Self {
        Self::default()
    }

    pub fn vacant() -> Self {
        Self {
            entrant: SlotEntrant::Vacant,
            ..Self::default()
        }
    }

    pub fn filled(participant_id: ParticipantId, seed: Option<u32>) -> Self {
        Self {
            entrant: SlotEntrant::Filled(participant_id),
            seed,
            score: None,
        }
    }
}

/// A single two-party match.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GameMatch {
    pub id: MatchId,
    pub key: MatchKey,
    pub status: MatchStatus,
    pub slots: [MatchSlot; 2],
    /// None until completed; stays None for draws and for matches canceled with nobody left.
    pub winner: Option<ParticipantId>,
    /// Resolved without play because only one participant was present.
    pub bye: bool,
    /// Replay / third-party match id used for validation.
    pub external_ref: Option<String>,
    pub reported_by: Option<ResultSource>,
    /// Bumped on every mutation; hosts compare-and-set on it.
    pub version: u64,
    /// Already returned by `advance` as newly ready.
    pub ready_announced: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GameMatch {
    pub fn new(key: MatchKey, slots: [MatchSlot; 2]) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            status: MatchStatus::Pending,
            slots,
            winner: None,
            bye: false,
            external_ref: None,
            reported_by: None,
            version: 0,
            ready_announced: false,
            started_at: None,
            completed_at: None,
        }
    }

    /// Participants currently filling the slots, in slot order.
    pub fn participants(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.slots.iter().filter_map(|s| s.entrant.participant())
    }

    /// Slot index held by the participant.
    pub fn slot_of(&self, participant_id: ParticipantId) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.entrant == SlotEntrant::Filled(participant_id))
    }

    pub fn involves(&self, participant_id: ParticipantId) -> bool {
        self.slot_of(participant_id).is_some()
    }

    /// The beaten participant of a contested, decided match.
    pub fn loser(&self) -> Option<ParticipantId> {
        if self.status != MatchStatus::Completed || self.bye {
            return None;
        }
        let winner = self.winner?;
        self.participants().find(|p| *p != winner)
    }

    /// Completed with equal scores and no winner.
    pub fn is_draw(&self) -> bool {
        self.status == MatchStatus::Completed && self.winner.is_none() && !self.bye
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn touch(&mut self) {
        self.version += 1;
    }
}
