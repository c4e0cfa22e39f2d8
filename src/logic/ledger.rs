//! Match result ledger: score reports, winner resolution, external overrides, and the start /
//! cancel / void transitions of individual matches.

use crate::logic::progression::{catch_up, reopen, resolve};
use crate::models::{
    GameMatch, MatchId, MatchSlot, MatchStatus, ParticipantId, ParticipantStatus, ResultSource,
    Tournament, TournamentError, TournamentFormat, TournamentResult, TournamentStatus,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Score for one participant of a match.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ParticipantScore {
    pub participant_id: ParticipantId,
    pub score: u32,
}

fn default_source() -> ResultSource {
    ResultSource::User
}

/// A (possibly partial) result for one match.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResultReport {
    pub scores: Vec<ParticipantScore>,
    #[serde(default = "default_source")]
    pub source: ResultSource,
    #[serde(default)]
    pub external_ref: Option<String>,
    /// Compare-and-set against `GameMatch::version`.
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl ResultReport {
    pub fn new(scores: &[(ParticipantId, u32)], source: ResultSource) -> Self {
        Self {
            scores: scores
                .iter()
                .map(|&(participant_id, score)| ParticipantScore {
                    participant_id,
                    score,
                })
                .collect(),
            source,
            external_ref: None,
            expected_version: None,
        }
    }

    pub fn user(scores: &[(ParticipantId, u32)]) -> Self {
        Self::new(scores, ResultSource::User)
    }

    pub fn with_external_ref(mut self, external_ref: impl Into<String>) -> Self {
        self.external_ref = Some(external_ref.into());
        self
    }

    pub fn with_expected_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Outcome {
    Slot(usize),
    Draw,
}

fn decide(scores: [Option<u32>; 2]) -> Option<Outcome> {
    match scores {
        [Some(a), Some(b)] if a > b => Some(Outcome::Slot(0)),
        [Some(a), Some(b)] if b > a => Some(Outcome::Slot(1)),
        [Some(_), Some(_)] => Some(Outcome::Draw),
        _ => None,
    }
}

fn draws_allowed(t: &Tournament) -> bool {
    t.format == TournamentFormat::RoundRobin && t.options.points.draw.is_some()
}

/// Lay the reported scores over `base`, by slot.
fn merge_scores(
    m: &GameMatch,
    base: [Option<u32>; 2],
    report: &ResultReport,
) -> TournamentResult<[Option<u32>; 2]> {
    let mut scores = base;
    let mut seen = [false; 2];
    for entry in &report.scores {
        let slot = m
            .slot_of(entry.participant_id)
            .ok_or(TournamentError::ParticipantNotInMatch(entry.participant_id))?;
        if seen[slot] {
            return Err(TournamentError::InvalidScores(format!(
                "participant {} reported twice",
                entry.participant_id
            )));
        }
        seen[slot] = true;
        scores[slot] = Some(entry.score);
    }
    Ok(scores)
}

fn require_in_progress(t: &Tournament) -> TournamentResult<()> {
    match t.status {
        TournamentStatus::InProgress => Ok(()),
        TournamentStatus::Completed => Err(TournamentError::ResultLocked),
        other => Err(TournamentError::InvalidState(format!(
            "tournament is {:?}",
            other
        ))),
    }
}

/// Record a result. Completes the match once both scores are in and decide a winner, then
/// progresses the bracket. A completed match only accepts an external-validator override.
pub fn report_result(
    t: &mut Tournament,
    match_id: MatchId,
    report: &ResultReport,
) -> TournamentResult<GameMatch> {
    let idx = t.match_position(match_id)?;
    if let Some(expected) = report.expected_version {
        let actual = t.matches[idx].version;
        if expected != actual {
            log::warn!(
                "Rejected stale report for match {}: expected version {}, found {}",
                match_id,
                expected,
                actual
            );
            return Err(TournamentError::VersionConflict { expected, actual });
        }
    }
    // only an external validator may still correct a completed tournament
    let external = report.source == ResultSource::ExternalValidator;
    if !(external && t.status == TournamentStatus::Completed) {
        require_in_progress(t).inspect_err(|e| {
            log::warn!("Rejected report for match {}: {}", match_id, e);
        })?;
    }
    if report.scores.is_empty() {
        return Err(TournamentError::InvalidScores("no scores reported".to_string()));
    }

    match t.matches[idx].status {
        status @ MatchStatus::Pending => return Err(TournamentError::MatchNotReady { status }),
        MatchStatus::Ready | MatchStatus::InProgress if t.status == TournamentStatus::InProgress => {
            record(t, idx, report)?
        }
        MatchStatus::Completed if external => override_result(t, idx, report)?,
        _ => {
            log::warn!("Rejected report for match {}: result is locked", match_id);
            return Err(TournamentError::ResultLocked);
        }
    }
    catch_up(t)?;
    Ok(t.matches[idx].clone())
}

fn record(t: &mut Tournament, idx: usize, report: &ResultReport) -> TournamentResult<()> {
    let draws_allowed = draws_allowed(t);
    let m = &t.matches[idx];
    let scores = merge_scores(m, [m.slots[0].score, m.slots[1].score], report)?;
    let outcome = decide(scores);
    if outcome == Some(Outcome::Draw) && !draws_allowed {
        log::warn!("Rejected draw for match {:?} in tournament {}", m.key, t.id);
        return Err(TournamentError::DrawNotAllowed);
    }

    let m = &mut t.matches[idx];
    apply_scores(m, scores, report);
    match outcome {
        None => {
            if m.status == MatchStatus::Ready {
                m.status = MatchStatus::InProgress;
                m.started_at.get_or_insert_with(Utc::now);
            }
            m.touch();
            Ok(())
        }
        Some(outcome) => {
            complete(m, outcome);
            resolve(t, idx)
        }
    }
}

fn apply_scores(m: &mut GameMatch, scores: [Option<u32>; 2], report: &ResultReport) {
    m.slots[0].score = scores[0];
    m.slots[1].score = scores[1];
    if report.external_ref.is_some() {
        m.external_ref = report.external_ref.clone();
    }
    m.reported_by = Some(report.source);
}

fn complete(m: &mut GameMatch, outcome: Outcome) {
    m.status = MatchStatus::Completed;
    m.winner = match outcome {
        Outcome::Slot(slot) => m.slots[slot].entrant.participant(),
        Outcome::Draw => None,
    };
    m.completed_at = Some(Utc::now());
    m.touch();
}

/// Replace a completed result. Allowed while every dependent match is still unstarted; a
/// completed tournament is reopened and completes again once the override is applied.
fn override_result(t: &mut Tournament, idx: usize, report: &ResultReport) -> TournamentResult<()> {
    let rules = t.format.rules();
    let m = &t.matches[idx];
    if m.bye || rules.override_locked(t, idx) {
        log::warn!(
            "Rejected override for match {:?} in tournament {}: dependents already started",
            m.key,
            t.id
        );
        return Err(TournamentError::ResultLocked);
    }
    let scores = merge_scores(m, [None, None], report)?;
    let Some(outcome) = decide(scores) else {
        return Err(TournamentError::InvalidScores(
            "an override must carry both scores".to_string(),
        ));
    };
    if outcome == Outcome::Draw && !draws_allowed(t) {
        return Err(TournamentError::DrawNotAllowed);
    }

    if t.status == TournamentStatus::Completed {
        reopen(t);
    }
    rules.retract(t, idx)?;
    unapply(t, idx)?;

    let m = &mut t.matches[idx];
    log::warn!(
        "External validator overrides result of {:?} (previous winner {:?})",
        m.key,
        m.winner
    );
    apply_scores(m, scores, report);
    complete(m, outcome);
    resolve(t, idx)
}

/// Take a completed result back out of the bracket: empty the slots it fed and reinstate the
/// participant it knocked out.
fn unapply(t: &mut Tournament, idx: usize) -> TournamentResult<()> {
    let (key, old_loser) = (t.matches[idx].key, t.matches[idx].loser());
    if let Some(layout) = t.layout {
        let rules = t.format.rules();
        let targets = [
            rules.winner_target(&layout, key),
            rules.loser_target(&layout, key),
        ];
        for target in targets.into_iter().flatten() {
            let Some(ti) = t.match_index(target.key) else {
                continue;
            };
            let downstream = &mut t.matches[ti];
            downstream.slots[target.slot] = MatchSlot::awaiting();
            if downstream.status == MatchStatus::Ready {
                downstream.status = MatchStatus::Pending;
                downstream.ready_announced = false;
            }
            downstream.touch();
        }
    }
    if let Some(loser) = old_loser {
        let p = t.participant_mut(loser)?;
        if p.status == ParticipantStatus::Eliminated {
            p.reinstate();
        }
    }
    Ok(())
}

/// READY -> IN_PROGRESS.
pub fn start_match(t: &mut Tournament, match_id: MatchId) -> TournamentResult<GameMatch> {
    require_in_progress(t)?;
    let idx = t.match_position(match_id)?;
    let m = &mut t.matches[idx];
    match m.status {
        MatchStatus::Ready => {
            m.status = MatchStatus::InProgress;
            m.started_at = Some(Utc::now());
            m.touch();
            Ok(m.clone())
        }
        status @ MatchStatus::Pending => Err(TournamentError::MatchNotReady { status }),
        status => Err(TournamentError::InvalidState(format!(
            "match is already {:?}",
            status
        ))),
    }
}

/// Host-initiated cancellation.
///
/// Pooled matches just stop counting. A bracket match may only be canceled once at most one of
/// its participants is still active; that participant advances as if by bye.
pub fn cancel_match(t: &mut Tournament, match_id: MatchId) -> TournamentResult<GameMatch> {
    require_in_progress(t)?;
    let idx = t.match_position(match_id)?;
    let m = &t.matches[idx];
    if m.is_terminal() {
        return Err(TournamentError::ResultLocked);
    }

    if t.format.is_elimination() {
        if m.status == MatchStatus::Pending {
            return Err(TournamentError::InvalidState(
                "a pending bracket match resolves from its feeders".to_string(),
            ));
        }
        let active: Vec<ParticipantId> = m
            .participants()
            .filter(|id| t.participant(*id).map(|p| p.is_active()).unwrap_or(false))
            .collect();
        if active.len() > 1 {
            return Err(TournamentError::InvalidState(
                "both participants are active; withdraw or disqualify one instead".to_string(),
            ));
        }
        let m = &mut t.matches[idx];
        m.status = MatchStatus::Canceled;
        m.winner = active.first().copied();
        m.completed_at = Some(Utc::now());
        m.touch();
        resolve(t, idx)?;
    } else {
        let m = &mut t.matches[idx];
        m.status = MatchStatus::Canceled;
        m.winner = None;
        m.completed_at = Some(Utc::now());
        m.touch();
    }
    log::info!("Tournament {}: match {} canceled", t.id, match_id);
    catch_up(t)?;
    Ok(t.matches[idx].clone())
}

/// Void a pooled match so it no longer counts toward standings.
pub fn void_match(t: &mut Tournament, match_id: MatchId) -> TournamentResult<GameMatch> {
    require_in_progress(t)?;
    if t.format.is_elimination() {
        return Err(TournamentError::InvalidState(
            "bracket matches cannot be voided".to_string(),
        ));
    }
    let idx = t.match_position(match_id)?;
    let status = t.matches[idx].status;
    let rules = t.format.rules();
    if matches!(status, MatchStatus::Canceled | MatchStatus::Void)
        || (status == MatchStatus::Completed && rules.override_locked(t, idx))
    {
        return Err(TournamentError::ResultLocked);
    }
    rules.retract(t, idx)?;
    let m = &mut t.matches[idx];
    m.status = MatchStatus::Void;
    m.winner = None;
    m.bye = false;
    m.touch();
    log::info!("Tournament {}: match {} voided", t.id, match_id);
    catch_up(t)?;
    Ok(t.matches[idx].clone())
}
