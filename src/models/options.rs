//! Build-time configuration: seeding policy, scoring table and format knobs.

use serde::{Deserialize, Serialize};

/// Points awarded per match outcome in pooled formats.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsTable {
    pub win: u32,
    /// Some(_) enables draws in round robin; None rejects tied scores.
    pub draw: Option<u32>,
    pub loss: u32,
}

impl Default for PointsTable {
    fn default() -> Self {
        Self {
            win: 3,
            draw: None,
            loss: 0,
        }
    }
}

/// How the ordered participant list is turned into bracket seeds.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "policy")]
pub enum SeedingPolicy {
    /// List order is seed order.
    #[default]
    AsListed,
    /// Registry-supplied seeds ascending; unseeded participants follow in list order.
    Requested,
    /// Reproducible shuffle of the list.
    Random { seed: u64 },
}

/// Per-tournament bracket options.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BracketOptions {
    /// Double elimination: replay the grand final if the losers-bracket champion wins it.
    pub bracket_reset: bool,
    pub points: PointsTable,
    /// Swiss round count. Default ceil(log2 N).
    pub swiss_rounds: Option<u32>,
    /// League round count. Default a double round robin.
    pub league_rounds: Option<u32>,
    /// Only checked-in participants may be placed in the bracket.
    pub require_check_in: bool,
}

impl Default for BracketOptions {
    fn default() -> Self {
        Self {
            bracket_reset: true,
            points: PointsTable::default(),
            swiss_rounds: None,
            league_rounds: None,
            require_check_in: false,
        }
    }
}
