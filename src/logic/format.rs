//! Per-format rules. Each format implements the same capability set and the engine dispatches on
//! `TournamentFormat` instead of branching on the format throughout.

use crate::logic::elimination::{DoubleElimination, SingleElimination};
use crate::logic::pool::{League, RoundRobin, Swiss};
use crate::models::{
    BracketLayout, BracketOptions, GameMatch, MatchKey, ParticipantId, Tournament,
    TournamentFormat, TournamentResult,
};

/// A participant placed in the bracket with its 1-based seed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Seeded {
    pub id: ParticipantId,
    pub seed: u32,
}

/// One side of a match, addressed by key.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct SlotRef {
    pub key: MatchKey,
    pub slot: usize,
}

/// Output of the initial build.
#[derive(Clone, Debug)]
pub struct BuiltBracket {
    pub layout: BracketLayout,
    pub matches: Vec<GameMatch>,
}

pub trait FormatRules: Sync {
    /// Initial layout and match rows for participants ordered by seed.
    fn build(&self, seeded: &[Seeded], options: &BracketOptions) -> TournamentResult<BuiltBracket>;

    /// Slot the winner of `key` moves into.
    fn winner_target(&self, _layout: &BracketLayout, _key: MatchKey) -> Option<SlotRef> {
        None
    }

    /// Slot the loser of `key` moves into (double elimination only).
    fn loser_target(&self, _layout: &BracketLayout, _key: MatchKey) -> Option<SlotRef> {
        None
    }

    /// Apply the outcome of the resolved match at arena position `idx`.
    fn on_match_complete(&self, t: &mut Tournament, idx: usize) -> TournamentResult<()>;

    /// Catch-up work `advance` performs (e.g. materializing the next Swiss round).
    fn progress(&self, _t: &mut Tournament) -> TournamentResult<()> {
        Ok(())
    }

    fn is_complete(&self, t: &Tournament) -> bool;

    /// (participant, placement) for every bracket participant, best first.
    fn placements(&self, t: &Tournament) -> Vec<(ParticipantId, u32)>;

    /// Elimination stage recorded for a participant leaving during the match at `key`.
    fn exit_stage(&self, _layout: &BracketLayout, _key: MatchKey) -> Option<u32> {
        None
    }

    /// Whether a completed result at `idx` can still be overridden.
    fn override_locked(&self, t: &Tournament, idx: usize) -> bool;

    /// Drop unplayed matches that were created from the completed result at `idx` before it is
    /// replaced. Only matches after `idx` in the arena may go.
    fn retract(&self, _t: &mut Tournament, _idx: usize) -> TournamentResult<()> {
        Ok(())
    }
}

static SINGLE_ELIMINATION: SingleElimination = SingleElimination;
static DOUBLE_ELIMINATION: DoubleElimination = DoubleElimination;
static ROUND_ROBIN: RoundRobin = RoundRobin;
static SWISS: Swiss = Swiss;
static LEAGUE: League = League;

impl TournamentFormat {
    /// Rules implementation for this format.
    pub fn rules(self) -> &'static dyn FormatRules {
        match self {
            TournamentFormat::SingleElimination => &SINGLE_ELIMINATION,
            TournamentFormat::DoubleElimination => &DOUBLE_ELIMINATION,
            TournamentFormat::RoundRobin => &ROUND_ROBIN,
            TournamentFormat::Swiss => &SWISS,
            TournamentFormat::League => &LEAGUE,
        }
    }
}

/// ceil(log2 n) for n >= 1.
pub fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        u32::BITS - (n - 1).leading_zeros()
    }
}
