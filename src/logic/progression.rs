//! Progression: slot claims, bye and cancellation cascades, moderation exits, integrity checks and
//! completion.

use crate::logic::format::SlotRef;
use crate::models::{
    BracketSide, GameMatch, MatchKey, MatchSlot, MatchStatus, ParticipantExit, ParticipantId,
    ParticipantStatus, SlotEntrant, Tournament, TournamentError, TournamentResult,
    TournamentStatus,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of `advance`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Advance {
    pub status: TournamentStatus,
    /// Matches that became READY since the last call. Each match is announced once.
    pub newly_ready_matches: Vec<GameMatch>,
}

/// Final standing of one participant.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub participant_id: ParticipantId,
    pub name: String,
    pub placement: u32,
}

/// Log at error level and build the error. Integrity violations are never repaired.
pub fn integrity_violation(message: String) -> TournamentError {
    log::error!("Bracket integrity violation: {}", message);
    TournamentError::IntegrityViolation(message)
}

/// Atomically move a participant (or nobody) into an awaiting slot, then settle the match.
pub fn claim_slot(
    t: &mut Tournament,
    target: SlotRef,
    participant: Option<ParticipantId>,
) -> TournamentResult<()> {
    let tournament_id = t.id;
    let idx = t.match_index(target.key).ok_or_else(|| {
        integrity_violation(format!(
            "tournament {}: feed target {:?} does not exist",
            tournament_id, target.key
        ))
    })?;
    let seed = participant.and_then(|p| t.seed_of(p));
    let m = &mut t.matches[idx];
    let Some(slot) = m.slots.get_mut(target.slot) else {
        return Err(integrity_violation(format!(
            "tournament {}: match {:?} has no slot {}",
            tournament_id, target.key, target.slot
        )));
    };
    if slot.entrant != SlotEntrant::Awaiting {
        return Err(integrity_violation(format!(
            "tournament {}: slot {} of {:?} already settled ({:?})",
            tournament_id, target.slot, target.key, slot.entrant
        )));
    }
    *slot = match participant {
        Some(id) => MatchSlot::filled(id, seed),
        None => MatchSlot::vacant(),
    };
    m.touch();
    log::debug!(
        "Tournament {}: {:?} claimed slot {} of {:?}",
        tournament_id,
        participant,
        target.slot,
        target.key
    );
    settle(t, idx)
}

/// Move a pending match on once both slots are settled: READY with two participants, a bye with
/// one, auto-canceled with none. Byes and cancellations cascade downstream.
pub fn settle(t: &mut Tournament, idx: usize) -> TournamentResult<()> {
    let tournament_id = t.id;
    let m = &mut t.matches[idx];
    if m.status != MatchStatus::Pending || m.slots.iter().any(|s| !s.entrant.is_settled()) {
        return Ok(());
    }
    let present: Vec<ParticipantId> = m.participants().collect();
    match present.as_slice() {
        [_, _] => {
            m.status = MatchStatus::Ready;
            m.touch();
            Ok(())
        }
        [single] => {
            m.status = MatchStatus::Completed;
            m.winner = Some(*single);
            m.bye = true;
            m.completed_at = Some(Utc::now());
            m.touch();
            log::debug!("Tournament {}: {:?} resolved as a bye", tournament_id, m.key);
            resolve(t, idx)
        }
        _ => {
            m.status = MatchStatus::Canceled;
            m.winner = None;
            m.completed_at = Some(Utc::now());
            m.touch();
            log::debug!(
                "Tournament {}: {:?} canceled, no participants left",
                tournament_id,
                m.key
            );
            resolve(t, idx)
        }
    }
}

/// Hand a terminal match to the format rules.
pub fn resolve(t: &mut Tournament, idx: usize) -> TournamentResult<()> {
    t.format.rules().on_match_complete(t, idx)
}

/// Remove a participant through moderation (withdrawal or disqualification).
///
/// After the build, every open bracket match they sit in loses them: a started or ready match is
/// canceled in favour of the remaining opponent, a pending one settles as a bye or cancels. In
/// pooled formats their open matches are simply canceled.
pub fn withdraw_participant(
    t: &mut Tournament,
    participant_id: ParticipantId,
    exit: ParticipantExit,
) -> TournamentResult<()> {
    if t.status.is_finished() {
        return Err(TournamentError::InvalidState(format!(
            "tournament is {:?}",
            t.status
        )));
    }
    let p = t.participant_mut(participant_id)?;
    if p.status.is_terminal() {
        return Err(TournamentError::InvalidState(format!(
            "participant already left the event ({:?})",
            p.status
        )));
    }
    p.status = exit.into();

    let Some(layout) = t.layout else {
        return Ok(());
    };
    let rules = t.format.rules();
    let open: Vec<usize> = t
        .matches
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.is_terminal() && m.involves(participant_id))
        .map(|(i, _)| i)
        .collect();

    let mut stage = None;
    for idx in open {
        let m = &t.matches[idx];
        // an earlier cascade may already have resolved it
        if m.is_terminal() || !m.involves(participant_id) {
            continue;
        }
        stage = stage.or(rules.exit_stage(&layout, m.key));
        if t.format.is_elimination() {
            vacate(t, idx, participant_id)?;
        } else {
            let m = &mut t.matches[idx];
            m.status = MatchStatus::Canceled;
            m.winner = None;
            m.completed_at = Some(Utc::now());
            m.touch();
        }
    }
    if stage.is_some() {
        t.participant_mut(participant_id)?.eliminated_stage = stage;
    }
    log::info!(
        "Tournament {}: participant {} left the event ({:?})",
        t.id,
        participant_id,
        exit
    );
    catch_up(t)
}

fn vacate(t: &mut Tournament, idx: usize, participant_id: ParticipantId) -> TournamentResult<()> {
    let m = &mut t.matches[idx];
    if let Some(slot) = m.slot_of(participant_id) {
        m.slots[slot] = MatchSlot::vacant();
    }
    m.touch();
    match m.status {
        MatchStatus::Pending => settle(t, idx),
        _ => {
            let remaining = m.participants().next();
            m.status = MatchStatus::Canceled;
            m.winner = remaining;
            m.completed_at = Some(Utc::now());
            resolve(t, idx)
        }
    }
}

/// Cancel the tournament and every match that has not finished.
pub fn cancel_tournament(t: &mut Tournament) -> TournamentResult<()> {
    if t.status.is_finished() {
        return Err(TournamentError::InvalidTransition {
            from: t.status,
            to: TournamentStatus::Canceled,
        });
    }
    for m in t.matches.iter_mut().filter(|m| !m.is_terminal()) {
        m.status = MatchStatus::Canceled;
        m.winner = None;
        m.touch();
    }
    t.status = TournamentStatus::Canceled;
    t.finished_at = Some(Utc::now());
    log::info!("Tournament {} canceled", t.id);
    Ok(())
}

/// Format catch-up work (next Swiss round) followed by the completion check.
pub fn catch_up(t: &mut Tournament) -> TournamentResult<()> {
    if t.status != TournamentStatus::InProgress {
        return Ok(());
    }
    t.format.rules().progress(t)?;
    complete_if_finished(t)?;
    Ok(())
}

/// Verify integrity, catch up, and return READY matches not announced before.
pub fn advance(t: &mut Tournament) -> TournamentResult<Advance> {
    if !matches!(
        t.status,
        TournamentStatus::InProgress | TournamentStatus::Completed
    ) {
        return Err(TournamentError::InvalidState(format!(
            "tournament is {:?}",
            t.status
        )));
    }
    verify_integrity(t)?;
    catch_up(t)?;

    let newly_ready_matches: Vec<GameMatch> = t
        .matches
        .iter_mut()
        .filter(|m| m.status == MatchStatus::Ready && !m.ready_announced)
        .map(|m| {
            m.ready_announced = true;
            m.clone()
        })
        .collect();
    if !newly_ready_matches.is_empty() {
        log::debug!(
            "Tournament {}: {} newly ready matches",
            t.id,
            newly_ready_matches.len()
        );
    }
    Ok(Advance {
        status: t.status,
        newly_ready_matches,
    })
}

/// Re-derive every feed from the terminal matches and compare it with the stored slots.
pub fn verify_integrity(t: &Tournament) -> TournamentResult<()> {
    let Some(layout) = t.layout else {
        return Ok(());
    };
    for m in &t.matches {
        if let Some(winner) = m.winner {
            if !m.involves(winner) {
                return Err(integrity_violation(format!(
                    "tournament {}: winner of {:?} is not one of its participants",
                    t.id, m.key
                )));
            }
        }
    }
    if !t.format.is_elimination() {
        return match t
            .matches
            .iter()
            .find(|m| m.slots.iter().any(|s| !s.entrant.is_settled()))
        {
            Some(m) => Err(integrity_violation(format!(
                "tournament {}: pool match {:?} has an unfilled slot",
                t.id, m.key
            ))),
            None => Ok(()),
        };
    }

    let rules = t.format.rules();
    let mut expected: BTreeMap<SlotRef, Option<ParticipantId>> = BTreeMap::new();
    for m in t.matches.iter().filter(|m| m.is_terminal()) {
        if let Some(target) = rules.winner_target(&layout, m.key) {
            expected.insert(target, m.winner);
        }
        if let Some(target) = rules.loser_target(&layout, m.key) {
            expected.insert(target, m.loser());
        }
    }

    let left_event = |id: ParticipantId| t.participant(id).map(|p| p.has_left()).unwrap_or(false);

    for m in &t.matches {
        match (m.key.side, m.key.round) {
            (BracketSide::Winners, 1) => continue,
            (BracketSide::GrandFinal, 2) => {
                verify_reset(t, m)?;
                continue;
            }
            _ => {}
        }
        for (slot, entry) in m.slots.iter().enumerate() {
            let target = SlotRef { key: m.key, slot };
            let consistent = match (expected.get(&target), entry.entrant) {
                (None, SlotEntrant::Awaiting) => true,
                (Some(Some(p)), SlotEntrant::Filled(q)) => *p == q,
                (Some(Some(p)), SlotEntrant::Vacant) => left_event(*p),
                (Some(None), SlotEntrant::Vacant) => true,
                _ => false,
            };
            if !consistent {
                return Err(integrity_violation(format!(
                    "tournament {}: slot {} of {:?} is {:?} but its feeder says {:?}",
                    t.id,
                    slot,
                    m.key,
                    entry.entrant,
                    expected.get(&target)
                )));
            }
        }
    }
    Ok(())
}

/// The reset match replays the first grand final's pairing.
fn verify_reset(t: &Tournament, reset: &GameMatch) -> TournamentResult<()> {
    let first = t.match_by_key(MatchKey::new(BracketSide::GrandFinal, 1, 0));
    let consistent = first.is_some_and(|first| {
        first.status == MatchStatus::Completed
            && reset.slots.iter().zip(first.slots.iter()).all(|(r, f)| {
                r.entrant == f.entrant || r.entrant == SlotEntrant::Vacant
            })
    });
    if consistent {
        Ok(())
    } else {
        Err(integrity_violation(format!(
            "tournament {}: grand-final reset does not follow the first grand final",
            t.id
        )))
    }
}

/// Complete the tournament if its format says every deciding match is done.
pub fn complete_if_finished(t: &mut Tournament) -> TournamentResult<bool> {
    if t.status != TournamentStatus::InProgress || !t.format.rules().is_complete(t) {
        return Ok(false);
    }
    finalize(t)?;
    Ok(true)
}

fn finalize(t: &mut Tournament) -> TournamentResult<()> {
    let placements = t.format.rules().placements(t);
    for &(id, placement) in &placements {
        t.participant_mut(id)?.placement = Some(placement);
    }

    let champions: Vec<ParticipantId> = placements
        .iter()
        .filter(|(_, placement)| *placement == 1)
        .map(|(id, _)| *id)
        .collect();
    if let [champion] = champions.as_slice() {
        let p = t.participant_mut(*champion)?;
        if p.is_active() {
            p.status = ParticipantStatus::Winner;
        }
    }

    t.status = TournamentStatus::Completed;
    t.finished_at = Some(Utc::now());
    match t.participants.iter().find(|p| p.status == ParticipantStatus::Winner) {
        Some(winner) => log::info!("Tournament {} completed, champion {}", t.id, winner.name),
        None => log::info!("Tournament {} completed without a champion", t.id),
    }
    Ok(())
}

/// COMPLETED -> IN_PROGRESS so a deciding result can be corrected. Placements and the champion
/// are derived again by the next completion check.
pub fn reopen(t: &mut Tournament) {
    for p in &mut t.participants {
        p.placement = None;
        if p.status == ParticipantStatus::Winner {
            p.status = ParticipantStatus::Active;
        }
    }
    t.status = TournamentStatus::InProgress;
    t.finished_at = None;
    log::warn!("Tournament {} reopened for an external override", t.id);
}

/// Final placements, best first. Ties share a placement and are listed by seed.
pub fn final_placements(t: &Tournament) -> TournamentResult<Vec<Placement>> {
    if t.status != TournamentStatus::Completed {
        return Err(TournamentError::NotCompleted);
    }
    let mut placed: Vec<_> = t
        .participants
        .iter()
        .filter_map(|p| p.placement.map(|placement| (placement, p.seed_key(), p)))
        .collect();
    placed.sort_by_key(|&(placement, seed, _)| (placement, seed));
    Ok(placed
        .into_iter()
        .map(|(placement, _, p)| Placement {
            participant_id: p.id,
            name: p.name.clone(),
            placement,
        })
        .collect())
}
