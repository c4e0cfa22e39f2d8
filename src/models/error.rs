//! Error taxonomy shared by every engine operation.

use crate::models::game::{MatchId, MatchStatus};
use crate::models::participant::ParticipantId;
use crate::models::tournament::{TournamentId, TournamentStatus};
use thiserror::Error;

/// Errors that can occur during tournament operations.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TournamentError {
    #[error("At least 2 participants are required to build a bracket (got {count})")]
    InvalidParticipantCount { count: usize },

    #[error("Unsupported tournament format: {0}")]
    UnsupportedFormat(String),

    #[error("Bracket has already been built for this tournament")]
    AlreadyBuilt,

    #[error("Draws are not allowed for this match")]
    DrawNotAllowed,

    #[error("Match result is locked")]
    ResultLocked,

    #[error("Match is not ready for results (status {status:?})")]
    MatchNotReady { status: MatchStatus },

    /// Corrupted bracket state. Never repaired automatically.
    #[error("Bracket integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Tournament has not completed")]
    NotCompleted,

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    #[error("Participant {0} is not in this match")]
    ParticipantNotInMatch(ParticipantId),

    #[error("Invalid scores: {0}")]
    InvalidScores(String),

    #[error("Cannot move tournament from {from:?} to {to:?}")]
    InvalidTransition {
        from: TournamentStatus,
        to: TournamentStatus,
    },

    #[error("Invalid state for this action: {0}")]
    InvalidState(String),

    #[error("Registration is not open")]
    RegistrationClosed,

    #[error("Registration limit of {limit} reached")]
    RegistrationFull { limit: usize },

    #[error("A participant with this name already exists")]
    DuplicateParticipantName,

    #[error("Format cannot change once the tournament is in progress")]
    FormatLocked,

    #[error("Match was modified concurrently: expected version {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("Tournament state lock poisoned")]
    LockPoisoned,

    #[error("Export failed: {0}")]
    Export(String),
}

impl TournamentError {
    /// Errors that indicate a defect rather than a caller mistake.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TournamentError::IntegrityViolation(_) | TournamentError::LockPoisoned
        )
    }
}

/// Result type for engine operations.
pub type TournamentResult<T> = Result<T, TournamentError>;
