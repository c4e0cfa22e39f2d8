//! Tournament bracket engine: builds match graphs for elimination and pooled formats, records
//! results, advances participants and produces final placements.

pub mod config;
pub mod engine;
pub mod export;
pub mod logic;
pub mod models;

pub use engine::BracketEngine;
pub use logic::{
    advance, build_bracket, cancel_match, cancel_tournament, final_placements, report_result,
    standings, start_match, verify_integrity, void_match, withdraw_participant, Advance,
    ParticipantScore, Placement, ResultReport, StandingsRow, TieBreakKey,
};
pub use models::{
    BracketLayout, BracketOptions, BracketSide, GameMatch, MatchId, MatchKey, MatchSlot,
    MatchStatus, Participant, ParticipantExit, ParticipantId, ParticipantStatus, PointsTable,
    ResultSource, SeedingPolicy, SlotEntrant, Tournament, TournamentError, TournamentFormat,
    TournamentId, TournamentResult, TournamentStatus,
};
