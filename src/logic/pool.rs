//! Pooled formats: round robin, Swiss and league. Matches have no downstream slot; results feed
//! the standings table instead.

use crate::logic::builder::pair_round;
use crate::logic::format::{ceil_log2, BuiltBracket, FormatRules, Seeded};
use crate::logic::standings::{next_pairing, standings};
use crate::models::{
    BracketLayout, BracketOptions, BracketSide, GameMatch, MatchKey, MatchSlot, ParticipantId,
    ParticipantStatus, Tournament, TournamentError, TournamentResult,
};

pub struct RoundRobin;
pub struct Swiss;
pub struct League;

/// Circle-method schedule over `n` entrants as index pairs per round.
///
/// Position 0 stays fixed while the rest rotate one step per round. An odd field gets a phantom
/// entrant, and whoever meets it sits the round out. The fixed entrant alternates home and away.
pub fn circle_schedule(n: usize) -> Vec<Vec<(usize, usize)>> {
    let mut ring: Vec<Option<usize>> = (0..n).map(Some).collect();
    if n % 2 == 1 {
        ring.push(None);
    }
    let m = ring.len();
    let mut rounds = Vec::with_capacity(m.saturating_sub(1));
    for round in 0..m.saturating_sub(1) {
        let mut pairs = Vec::with_capacity(m / 2);
        for i in 0..m / 2 {
            if let (Some(a), Some(b)) = (ring[i], ring[m - 1 - i]) {
                pairs.push(if i == 0 && round % 2 == 1 { (b, a) } else { (a, b) });
            }
        }
        rounds.push(pairs);
        ring[1..].rotate_right(1);
    }
    rounds
}

fn pool_rows(seeded: &[Seeded], schedule: &[Vec<(usize, usize)>]) -> Vec<GameMatch> {
    let slot = |i: usize| MatchSlot::filled(seeded[i].id, Some(seeded[i].seed));
    schedule
        .iter()
        .enumerate()
        .flat_map(|(round, pairs)| {
            pairs.iter().enumerate().map(move |(sequence, &(a, b))| {
                GameMatch::new(
                    MatchKey::new(BracketSide::Pool, round as u32 + 1, sequence as u32),
                    [slot(a), slot(b)],
                )
            })
        })
        .collect()
}

fn pooled_layout(entrants: usize, rounds: usize) -> BracketLayout {
    BracketLayout {
        entrants: entrants as u32,
        winners_rounds: 0,
        losers_rounds: 0,
        pool_rounds: rounds as u32,
    }
}

fn all_terminal(t: &Tournament) -> bool {
    !t.matches.is_empty() && t.matches.iter().all(|m| m.is_terminal())
}

fn standings_placements(t: &Tournament) -> Vec<(ParticipantId, u32)> {
    standings(t)
        .into_iter()
        .map(|row| (row.participant_id, row.rank))
        .collect()
}

fn latest_round(t: &Tournament) -> u32 {
    t.matches.iter().map(|m| m.key.round).max().unwrap_or(0)
}

impl FormatRules for RoundRobin {
    fn build(&self, seeded: &[Seeded], _options: &BracketOptions) -> TournamentResult<BuiltBracket> {
        let schedule = circle_schedule(seeded.len());
        Ok(BuiltBracket {
            layout: pooled_layout(seeded.len(), schedule.len()),
            matches: pool_rows(seeded, &schedule),
        })
    }

    fn on_match_complete(&self, _t: &mut Tournament, _idx: usize) -> TournamentResult<()> {
        Ok(())
    }

    fn is_complete(&self, t: &Tournament) -> bool {
        all_terminal(t)
    }

    fn placements(&self, t: &Tournament) -> Vec<(ParticipantId, u32)> {
        standings_placements(t)
    }

    fn override_locked(&self, _t: &Tournament, _idx: usize) -> bool {
        false
    }
}

impl FormatRules for League {
    fn build(&self, seeded: &[Seeded], options: &BracketOptions) -> TournamentResult<BuiltBracket> {
        let base = circle_schedule(seeded.len());
        let rounds = match options.league_rounds {
            Some(0) => {
                return Err(TournamentError::InvalidState(
                    "a league needs at least one round".to_string(),
                ))
            }
            Some(rounds) => rounds as usize,
            None => 2 * base.len(),
        };
        // cycle the single round robin, swapping home and away on every second pass
        let schedule: Vec<Vec<(usize, usize)>> = (0..rounds)
            .map(|r| {
                let pass = r / base.len();
                base[r % base.len()]
                    .iter()
                    .map(|&(a, b)| if pass % 2 == 1 { (b, a) } else { (a, b) })
                    .collect()
            })
            .collect();
        Ok(BuiltBracket {
            layout: pooled_layout(seeded.len(), schedule.len()),
            matches: pool_rows(seeded, &schedule),
        })
    }

    fn on_match_complete(&self, _t: &mut Tournament, _idx: usize) -> TournamentResult<()> {
        Ok(())
    }

    fn is_complete(&self, t: &Tournament) -> bool {
        all_terminal(t)
    }

    fn placements(&self, t: &Tournament) -> Vec<(ParticipantId, u32)> {
        standings_placements(t)
    }

    fn override_locked(&self, _t: &Tournament, _idx: usize) -> bool {
        false
    }
}

impl FormatRules for Swiss {
    /// Only round 1 is built: top half against bottom half by seed, lowest seed sits out an odd field.
    fn build(&self, seeded: &[Seeded], options: &BracketOptions) -> TournamentResult<BuiltBracket> {
        let rounds = match options.swiss_rounds {
            Some(0) => {
                return Err(TournamentError::InvalidState(
                    "a Swiss event needs at least one round".to_string(),
                ))
            }
            Some(rounds) => rounds,
            None => ceil_log2(seeded.len() as u32).max(1),
        };

        let paired = seeded.len() - seeded.len() % 2;
        let half = paired / 2;
        let mut matches: Vec<GameMatch> = (0..half)
            .map(|i| {
                let (top, bottom) = (seeded[i], seeded[i + half]);
                GameMatch::new(
                    MatchKey::new(BracketSide::Pool, 1, i as u32),
                    [
                        MatchSlot::filled(top.id, Some(top.seed)),
                        MatchSlot::filled(bottom.id, Some(bottom.seed)),
                    ],
                )
            })
            .collect();
        if let Some(last) = seeded.get(paired) {
            matches.push(GameMatch::new(
                MatchKey::new(BracketSide::Pool, 1, half as u32),
                [MatchSlot::filled(last.id, Some(last.seed)), MatchSlot::vacant()],
            ));
        }

        Ok(BuiltBracket {
            layout: BracketLayout {
                entrants: seeded.len() as u32,
                winners_rounds: 0,
                losers_rounds: 0,
                pool_rounds: rounds,
            },
            matches,
        })
    }

    fn on_match_complete(&self, _t: &mut Tournament, _idx: usize) -> TournamentResult<()> {
        Ok(())
    }

    /// Materialize the next round once every match of the current one is terminal.
    fn progress(&self, t: &mut Tournament) -> TournamentResult<()> {
        let layout = t.layout()?;
        let current = latest_round(t);
        if current >= layout.pool_rounds || !all_terminal(t) {
            return Ok(());
        }
        let pairing = next_pairing(t);
        if pairing.pairs.is_empty() {
            log::debug!(
                "Tournament {}: fewer than two active participants, no Swiss round {}",
                t.id,
                current + 1
            );
            return Ok(());
        }
        pair_round(t, current + 1, &pairing)?;
        log::info!(
            "Tournament {}: Swiss round {} paired ({} matches)",
            t.id,
            current + 1,
            pairing.pairs.len()
        );
        Ok(())
    }

    fn is_complete(&self, t: &Tournament) -> bool {
        let Some(layout) = t.layout else {
            return false;
        };
        if !all_terminal(t) {
            return false;
        }
        let active = t
            .participants
            .iter()
            .filter(|p| p.status == ParticipantStatus::Active)
            .count();
        latest_round(t) >= layout.pool_rounds || active < 2
    }

    fn placements(&self, t: &Tournament) -> Vec<(ParticipantId, u32)> {
        standings_placements(t)
    }

    /// Later rounds were paired from this result; locked once one of their matches has started.
    fn override_locked(&self, t: &Tournament, idx: usize) -> bool {
        let round = t.matches[idx].key.round;
        t.matches
            .iter()
            .any(|m| m.key.round > round && !m.bye && !m.status.is_unstarted())
    }

    /// Unplayed later rounds go; `progress` pairs them again from the corrected standings.
    fn retract(&self, t: &mut Tournament, idx: usize) -> TournamentResult<()> {
        let round = t.matches[idx].key.round;
        let before = t.matches.len();
        t.matches.retain(|m| m.key.round <= round);
        if t.matches.len() < before {
            log::info!(
                "Tournament {}: dropped {} unplayed Swiss matches after round {}",
                t.id,
                before - t.matches.len(),
                round
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn circle_schedule_pairs_everyone_once() {
        for n in 2..=9 {
            let schedule = circle_schedule(n);
            let mut seen = BTreeSet::new();
            for round in &schedule {
                let mut busy = BTreeSet::new();
                for &(a, b) in round {
                    assert!(busy.insert(a) && busy.insert(b), "double-booked in n={n}");
                    assert!(seen.insert((a.min(b), a.max(b))), "rematch in n={n}");
                }
                assert!(n - busy.len() <= 1);
            }
            assert_eq!(seen.len(), n * (n - 1) / 2);
        }
    }

    #[test]
    fn odd_field_gives_one_idle_entrant_per_round() {
        let schedule = circle_schedule(5);
        assert_eq!(schedule.len(), 5);
        assert!(schedule.iter().all(|round| round.len() == 2));
    }
}
