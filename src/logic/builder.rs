//! Bracket construction: participant selection, seeding, the one-time initial build, and the
//! round-pairing primitive Swiss uses for later rounds.

use crate::logic::format::Seeded;
use crate::logic::progression::settle;
use crate::logic::standings::Pairing;
use crate::models::{
    BracketOptions, BracketSide, GameMatch, MatchKey, MatchSlot, ParticipantId, ParticipantStatus,
    SeedingPolicy, Tournament, TournamentError, TournamentFormat, TournamentResult,
    TournamentStatus,
};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Build the bracket for `participant_ids` (empty = every eligible registrant, in registration order).
///
/// This is a one-time operation that closes registration: the tournament must be
/// REGISTRATION_OPEN and moves to IN_PROGRESS, the chosen participants become ACTIVE with seeds
/// 1..=N, and first-round byes are resolved immediately.
pub fn build_bracket(
    t: &mut Tournament,
    participant_ids: &[ParticipantId],
    format: TournamentFormat,
    seeding: SeedingPolicy,
    options: BracketOptions,
) -> TournamentResult<Vec<GameMatch>> {
    if t.layout.is_some() {
        return Err(TournamentError::AlreadyBuilt);
    }
    if t.status != TournamentStatus::RegistrationOpen {
        return Err(TournamentError::InvalidTransition {
            from: t.status,
            to: TournamentStatus::InProgress,
        });
    }

    let eligible = |status: ParticipantStatus| {
        if options.require_check_in {
            status == ParticipantStatus::CheckedIn
        } else {
            status.is_eligible()
        }
    };
    let chosen: Vec<ParticipantId> = if participant_ids.is_empty() {
        t.participants
            .iter()
            .filter(|p| eligible(p.status))
            .map(|p| p.id)
            .collect()
    } else {
        let mut chosen = Vec::with_capacity(participant_ids.len());
        for &id in participant_ids {
            let p = t.participant(id)?;
            if !eligible(p.status) {
                return Err(TournamentError::InvalidState(format!(
                    "participant {} cannot be placed in the bracket ({:?})",
                    p.name, p.status
                )));
            }
            if chosen.contains(&id) {
                return Err(TournamentError::InvalidState(format!(
                    "participant {} listed twice",
                    p.name
                )));
            }
            chosen.push(id);
        }
        chosen
    };
    if chosen.len() < 2 {
        return Err(TournamentError::InvalidParticipantCount {
            count: chosen.len(),
        });
    }

    let seeded: Vec<Seeded> = seed_order(t, chosen, seeding)?
        .into_iter()
        .enumerate()
        .map(|(i, id)| Seeded {
            id,
            seed: i as u32 + 1,
        })
        .collect();
    let built = format.rules().build(&seeded, &options)?;

    t.set_format(format)?;
    t.options = options;
    for s in &seeded {
        let p = t.participant_mut(s.id)?;
        p.status = ParticipantStatus::Active;
        p.seed = Some(s.seed);
    }
    t.layout = Some(built.layout);
    t.matches = built.matches;
    t.status = TournamentStatus::InProgress;
    t.started_at = Some(Utc::now());

    let mut idx = 0;
    while idx < t.matches.len() {
        settle(t, idx)?;
        idx += 1;
    }

    log::info!(
        "Tournament {}: built {} bracket, {} participants, {} matches",
        t.id,
        format,
        seeded.len(),
        t.matches.len()
    );
    Ok(t.matches.clone())
}

/// Order the chosen participants into seed order.
fn seed_order(
    t: &Tournament,
    mut chosen: Vec<ParticipantId>,
    seeding: SeedingPolicy,
) -> TournamentResult<Vec<ParticipantId>> {
    match seeding {
        SeedingPolicy::AsListed => {}
        SeedingPolicy::Requested => {
            let mut keyed = Vec::with_capacity(chosen.len());
            for id in chosen {
                keyed.push((t.participant(id)?.requested_seed, id));
            }
            // stable: unseeded participants keep list order after the seeded ones
            keyed.sort_by_key(|(requested, _)| (requested.is_none(), *requested));
            chosen = keyed.into_iter().map(|(_, id)| id).collect();
        }
        SeedingPolicy::Random { seed } => {
            let mut rng = StdRng::seed_from_u64(seed);
            chosen.shuffle(&mut rng);
        }
    }
    Ok(chosen)
}

/// Materialize one pooled round from a pairing. A bye becomes a completed match with one vacant slot.
pub fn pair_round(t: &mut Tournament, round: u32, pairing: &Pairing) -> TournamentResult<()> {
    let start = t.matches.len();
    for (sequence, &(a, b)) in pairing.pairs.iter().enumerate() {
        let slots = [
            MatchSlot::filled(a, t.seed_of(a)),
            MatchSlot::filled(b, t.seed_of(b)),
        ];
        t.matches.push(GameMatch::new(
            MatchKey::new(BracketSide::Pool, round, sequence as u32),
            slots,
        ));
    }
    if let Some(bye) = pairing.bye {
        let slots = [MatchSlot::filled(bye, t.seed_of(bye)), MatchSlot::vacant()];
        t.matches.push(GameMatch::new(
            MatchKey::new(BracketSide::Pool, round, pairing.pairs.len() as u32),
            slots,
        ));
    }
    for idx in start..t.matches.len() {
        settle(t, idx)?;
    }
    Ok(())
}
