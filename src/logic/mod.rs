//! Bracket business logic: building, result reporting, progression and standings.

mod builder;
mod elimination;
mod format;
mod ledger;
mod pool;
mod progression;
mod standings;

pub use builder::{build_bracket, pair_round};
pub use elimination::seed_positions;
pub use format::{ceil_log2, BuiltBracket, FormatRules, Seeded, SlotRef};
pub use ledger::{
    cancel_match, report_result, start_match, void_match, ParticipantScore, ResultReport,
};
pub use pool::circle_schedule;
pub use progression::{
    advance, cancel_tournament, claim_slot, complete_if_finished, final_placements,
    verify_integrity, withdraw_participant, Advance, Placement,
};
pub use standings::{next_pairing, standings, Pairing, StandingsRow, TieBreakKey};
