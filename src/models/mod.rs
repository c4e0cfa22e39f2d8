//! Data structures for the bracket engine: tournaments, participants, matches and options.

mod error;
mod game;
mod options;
mod participant;
mod tournament;

pub use error::{TournamentError, TournamentResult};
pub use game::{
    BracketSide, GameMatch, MatchId, MatchKey, MatchSlot, MatchStatus, ResultSource, SlotEntrant,
};
pub use options::{BracketOptions, PointsTable, SeedingPolicy};
pub use participant::{Participant, ParticipantExit, ParticipantId, ParticipantStatus};
pub use tournament::{BracketLayout, Tournament, TournamentFormat, TournamentId, TournamentStatus};
