//! In-memory tournament registry for hosts.
//!
//! Each tournament sits behind its own mutex, so writes to one tournament (and therefore every
//! slot claim in its bracket) are serialized while different tournaments proceed in parallel.
//! Matches are looked up by id through a secondary index kept in step after every mutation.

use crate::logic::{
    advance, build_bracket, cancel_match, cancel_tournament, final_placements, report_result,
    standings, start_match, void_match, withdraw_participant, Advance, Placement, ResultReport,
    StandingsRow,
};
use crate::models::{
    BracketOptions, GameMatch, MatchId, ParticipantExit, ParticipantId, SeedingPolicy, Tournament,
    TournamentError, TournamentFormat, TournamentId, TournamentResult,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

#[derive(Default)]
pub struct BracketEngine {
    tournaments: RwLock<HashMap<TournamentId, Arc<Mutex<Tournament>>>>,
    match_index: RwLock<HashMap<MatchId, TournamentId>>,
}

impl BracketEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: TournamentId) -> TournamentResult<Arc<Mutex<Tournament>>> {
        let tournaments = self
            .tournaments
            .read()
            .map_err(|_| TournamentError::LockPoisoned)?;
        tournaments
            .get(&id)
            .cloned()
            .ok_or(TournamentError::TournamentNotFound(id))
    }

    /// Run `f` under the tournament's lock, then refresh the match index.
    fn with_tournament<R>(
        &self,
        id: TournamentId,
        f: impl FnOnce(&mut Tournament) -> TournamentResult<R>,
    ) -> TournamentResult<R> {
        let entry = self.entry(id)?;
        let mut t = entry.lock().map_err(|_| TournamentError::LockPoisoned)?;
        let result = f(&mut *t);
        self.reindex(&t)?;
        result
    }

    fn read_tournament<R>(
        &self,
        id: TournamentId,
        f: impl FnOnce(&Tournament) -> TournamentResult<R>,
    ) -> TournamentResult<R> {
        let entry = self.entry(id)?;
        let t = entry.lock().map_err(|_| TournamentError::LockPoisoned)?;
        f(&*t)
    }

    fn owner_of(&self, match_id: MatchId) -> TournamentResult<TournamentId> {
        let index = self
            .match_index
            .read()
            .map_err(|_| TournamentError::LockPoisoned)?;
        index
            .get(&match_id)
            .copied()
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    fn with_match<R>(
        &self,
        match_id: MatchId,
        f: impl FnOnce(&mut Tournament) -> TournamentResult<R>,
    ) -> TournamentResult<R> {
        let owner = self.owner_of(match_id)?;
        self.with_tournament(owner, f)
    }

    fn reindex(&self, t: &Tournament) -> TournamentResult<()> {
        let mut index = self
            .match_index
            .write()
            .map_err(|_| TournamentError::LockPoisoned)?;
        index.retain(|_, owner| *owner != t.id);
        index.extend(t.matches.iter().map(|m| (m.id, t.id)));
        Ok(())
    }

    /// Create a tournament in DRAFT.
    pub fn create_tournament(
        &self,
        name: impl Into<String>,
        format: TournamentFormat,
        registration_limit: Option<usize>,
    ) -> TournamentResult<Tournament> {
        let t = Tournament::new(name, format, registration_limit);
        self.insert(t.clone())?;
        Ok(t)
    }

    /// Register an existing tournament (e.g. loaded from the host's store).
    pub fn insert(&self, t: Tournament) -> TournamentResult<TournamentId> {
        let id = t.id;
        self.reindex(&t)?;
        self.tournaments
            .write()
            .map_err(|_| TournamentError::LockPoisoned)?
            .insert(id, Arc::new(Mutex::new(t)));
        Ok(id)
    }

    pub fn snapshot(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.read_tournament(id, |t| Ok(t.clone()))
    }

    pub fn get_match(&self, match_id: MatchId) -> TournamentResult<GameMatch> {
        let owner = self.owner_of(match_id)?;
        self.read_tournament(owner, |t| t.get_match(match_id).cloned())
    }

    pub fn publish(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.with_tournament(id, |t| {
            t.publish()?;
            Ok(t.clone())
        })
    }

    pub fn open_registration(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.with_tournament(id, |t| {
            t.open_registration()?;
            Ok(t.clone())
        })
    }

    pub fn set_format(&self, id: TournamentId, format: TournamentFormat) -> TournamentResult<Tournament> {
        self.with_tournament(id, |t| {
            t.set_format(format)?;
            Ok(t.clone())
        })
    }

    pub fn cancel_tournament(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.with_tournament(id, |t| {
            cancel_tournament(t)?;
            Ok(t.clone())
        })
    }

    pub fn register(
        &self,
        id: TournamentId,
        name: &str,
        requested_seed: Option<u32>,
    ) -> TournamentResult<ParticipantId> {
        self.with_tournament(id, |t| t.register_participant(name, requested_seed))
    }

    pub fn check_in(&self, id: TournamentId, participant_id: ParticipantId) -> TournamentResult<()> {
        self.with_tournament(id, |t| t.check_in(participant_id))
    }

    pub fn withdraw(
        &self,
        id: TournamentId,
        participant_id: ParticipantId,
        exit: ParticipantExit,
    ) -> TournamentResult<Tournament> {
        self.with_tournament(id, |t| {
            withdraw_participant(t, participant_id, exit)?;
            Ok(t.clone())
        })
    }

    /// Build the bracket once. An empty `participant_ids` takes every eligible registrant.
    pub fn build_bracket(
        &self,
        id: TournamentId,
        participant_ids: &[ParticipantId],
        format: TournamentFormat,
        seeding: SeedingPolicy,
        options: BracketOptions,
    ) -> TournamentResult<Vec<GameMatch>> {
        self.with_tournament(id, |t| {
            build_bracket(t, participant_ids, format, seeding, options)
        })
    }

    pub fn report_result(&self, match_id: MatchId, report: &ResultReport) -> TournamentResult<GameMatch> {
        self.with_match(match_id, |t| report_result(t, match_id, report))
    }

    pub fn start_match(&self, match_id: MatchId) -> TournamentResult<GameMatch> {
        self.with_match(match_id, |t| start_match(t, match_id))
    }

    pub fn cancel_match(&self, match_id: MatchId) -> TournamentResult<GameMatch> {
        self.with_match(match_id, |t| cancel_match(t, match_id))
    }

    pub fn void_match(&self, match_id: MatchId) -> TournamentResult<GameMatch> {
        self.with_match(match_id, |t| void_match(t, match_id))
    }

    /// Idempotent: a second call with no new results returns no matches.
    pub fn advance(&self, id: TournamentId) -> TournamentResult<Advance> {
        self.with_tournament(id, advance)
    }

    pub fn get_standings(&self, id: TournamentId) -> TournamentResult<Vec<StandingsRow>> {
        self.read_tournament(id, |t| Ok(standings(t)))
    }

    pub fn get_final_placements(&self, id: TournamentId) -> TournamentResult<Vec<Placement>> {
        self.read_tournament(id, final_placements)
    }

    /// Drop completed or canceled tournaments that finished before `cutoff`. Returns how many went.
    pub fn archive_finished(&self, cutoff: DateTime<Utc>) -> TournamentResult<usize> {
        let mut tournaments = self
            .tournaments
            .write()
            .map_err(|_| TournamentError::LockPoisoned)?;
        let expired: Vec<TournamentId> = tournaments
            .iter()
            .filter(|(_, entry)| {
                entry
                    .lock()
                    .map(|t| t.status.is_finished() && t.finished_at.is_some_and(|at| at < cutoff))
                    .unwrap_or(false)
            })
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            tournaments.remove(id);
        }
        drop(tournaments);

        if !expired.is_empty() {
            let mut index = self
                .match_index
                .write()
                .map_err(|_| TournamentError::LockPoisoned)?;
            index.retain(|_, owner| !expired.contains(owner));
            log::info!("Archived {} finished tournament(s)", expired.len());
        }
        Ok(expired.len())
    }

    pub fn len(&self) -> usize {
        self.tournaments.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
