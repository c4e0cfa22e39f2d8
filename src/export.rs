//! CSV export of final placements for payout processing.

use crate::logic::Placement;
use crate::models::{TournamentError, TournamentResult};

/// Render placements as CSV, one serialized `Placement` per row under a
/// `participant_id,name,placement` header.
pub fn placements_csv(placements: &[Placement]) -> TournamentResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for p in placements {
        writer
            .serialize(p)
            .map_err(|e| TournamentError::Export(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| TournamentError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| TournamentError::Export(e.to_string()))
}
