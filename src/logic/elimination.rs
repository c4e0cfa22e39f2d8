//! Single and double elimination: bracket layout, feed arithmetic and placements.
//!
//! Matches are keyed by (side, round, sequence). Round r's match i always feeds round r+1's match
//! i/2 in the winners bracket; losers-bracket routing is likewise integer arithmetic on the key, so
//! the match graph is never stored and can be re-derived at any time.

use crate::logic::format::{ceil_log2, BuiltBracket, FormatRules, Seeded, SlotRef};
use crate::logic::progression::{claim_slot, integrity_violation, settle};
use crate::models::{
    BracketLayout, BracketOptions, BracketSide, GameMatch, MatchKey, MatchSlot, ParticipantId,
    Tournament, TournamentResult,
};

pub struct SingleElimination;
pub struct DoubleElimination;

/// Standard bracket order for `size` slots (power of two): seed 1 meets seed `size`, and the top two
/// seeds can only meet in the final. Seeds above the entrant count are byes.
pub fn seed_positions(size: u32) -> Vec<u32> {
    let mut order = vec![1u32];
    while (order.len() as u32) < size {
        let next_len = order.len() as u32 * 2;
        order = order
            .iter()
            .flat_map(|&s| [s, next_len + 1 - s])
            .collect();
    }
    order
}

/// Winners-bracket rows: round 1 seeded (byes vacant), later rounds awaiting their feeders.
fn winners_rows(seeded: &[Seeded], rounds: u32) -> Vec<GameMatch> {
    let size = 1u32 << rounds;
    let slot_for = |seed: u32| {
        seeded
            .iter()
            .find(|s| s.seed == seed)
            .map(|s| MatchSlot::filled(s.id, Some(s.seed)))
            .unwrap_or_else(MatchSlot::vacant)
    };

    let mut rows: Vec<GameMatch> = seed_positions(size)
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| {
            GameMatch::new(
                MatchKey::new(BracketSide::Winners, 1, i as u32),
                [slot_for(pair[0]), slot_for(pair[1])],
            )
        })
        .collect();

    for round in 2..=rounds {
        for sequence in 0..(size >> round) {
            rows.push(awaiting(BracketSide::Winners, round, sequence));
        }
    }
    rows
}

/// Rows in losers round `round` (1-based): S/4, S/4, S/8, S/8, ...
fn losers_round_rows(layout: &BracketLayout, round: u32) -> u32 {
    layout.bracket_size() >> ((round + 1) / 2 + 1)
}

fn awaiting(side: BracketSide, round: u32, sequence: u32) -> GameMatch {
    GameMatch::new(
        MatchKey::new(side, round, sequence),
        [MatchSlot::awaiting(), MatchSlot::awaiting()],
    )
}

fn halve(key: MatchKey, side: BracketSide, round: u32) -> SlotRef {
    SlotRef {
        key: MatchKey::new(side, round, key.sequence / 2),
        slot: (key.sequence % 2) as usize,
    }
}

fn grand_final(round: u32) -> MatchKey {
    MatchKey::new(BracketSide::GrandFinal, round, 0)
}

/// True if any existing dependent match has already started.
fn dependents_started(t: &Tournament, targets: &[Option<SlotRef>]) -> bool {
    targets.iter().flatten().any(|target| {
        t.match_by_key(target.key)
            .map(|m| !m.status.is_unstarted())
            .unwrap_or(false)
    })
}

/// Competition ranking by elimination stage: 1 + number of participants eliminated strictly later.
fn stage_placements(t: &Tournament, champion: Option<ParticipantId>) -> Vec<(ParticipantId, u32)> {
    let keyed: Vec<(ParticipantId, u32, u32)> = t
        .seeded_participants()
        .into_iter()
        .map(|p| {
            let stage = if Some(p.id) == champion {
                u32::MAX
            } else {
                p.eliminated_stage.unwrap_or(0)
            };
            (p.id, stage, p.seed_key())
        })
        .collect();

    let mut placed: Vec<(ParticipantId, u32, u32)> = keyed
        .iter()
        .map(|&(id, stage, seed)| {
            let better = keyed.iter().filter(|(_, other, _)| *other > stage).count() as u32;
            (id, better + 1, seed)
        })
        .collect();
    placed.sort_by_key(|&(_, placement, seed)| (placement, seed));
    placed.into_iter().map(|(id, placement, _)| (id, placement)).collect()
}

fn eliminate(t: &mut Tournament, participant_id: ParticipantId, stage: u32) -> TournamentResult<()> {
    t.participant_mut(participant_id)?.eliminate(stage);
    Ok(())
}

impl FormatRules for SingleElimination {
    fn build(&self, seeded: &[Seeded], _options: &BracketOptions) -> TournamentResult<BuiltBracket> {
        let rounds = ceil_log2(seeded.len() as u32);
        Ok(BuiltBracket {
            layout: BracketLayout {
                entrants: seeded.len() as u32,
                winners_rounds: rounds,
                losers_rounds: 0,
                pool_rounds: 0,
            },
            matches: winners_rows(seeded, rounds),
        })
    }

    fn winner_target(&self, layout: &BracketLayout, key: MatchKey) -> Option<SlotRef> {
        (key.side == BracketSide::Winners && key.round < layout.winners_rounds)
            .then(|| halve(key, BracketSide::Winners, key.round + 1))
    }

    fn on_match_complete(&self, t: &mut Tournament, idx: usize) -> TournamentResult<()> {
        let layout = t.layout()?;
        let (key, winner, loser) = {
            let m = &t.matches[idx];
            (m.key, m.winner, m.loser())
        };
        if let Some(loser) = loser {
            eliminate(t, loser, key.round)?;
        }
        if let Some(target) = self.winner_target(&layout, key) {
            claim_slot(t, target, winner)?;
        }
        Ok(())
    }

    fn is_complete(&self, t: &Tournament) -> bool {
        let Some(layout) = t.layout else {
            return false;
        };
        t.match_by_key(MatchKey::new(BracketSide::Winners, layout.winners_rounds, 0))
            .map(|m| m.is_terminal())
            .unwrap_or(false)
    }

    fn placements(&self, t: &Tournament) -> Vec<(ParticipantId, u32)> {
        let champion = t.layout.and_then(|layout| {
            t.match_by_key(MatchKey::new(BracketSide::Winners, layout.winners_rounds, 0))
                .and_then(|m| m.winner)
        });
        stage_placements(t, champion)
    }

    fn exit_stage(&self, _layout: &BracketLayout, key: MatchKey) -> Option<u32> {
        Some(key.round)
    }

    fn override_locked(&self, t: &Tournament, idx: usize) -> bool {
        let Some(layout) = t.layout else {
            return true;
        };
        dependents_started(t, &[self.winner_target(&layout, t.matches[idx].key)])
    }
}

impl DoubleElimination {
    fn create_reset(
        &self,
        t: &mut Tournament,
        winners_champion: ParticipantId,
        losers_champion: ParticipantId,
    ) -> TournamentResult<()> {
        let key = grand_final(2);
        if t.match_index(key).is_some() {
            return Err(integrity_violation(format!(
                "tournament {}: grand-final reset created twice",
                t.id
            )));
        }
        let slots = [
            MatchSlot::filled(winners_champion, t.seed_of(winners_champion)),
            MatchSlot::filled(losers_champion, t.seed_of(losers_champion)),
        ];
        t.matches.push(GameMatch::new(key, slots));
        log::info!("Tournament {}: losers-bracket champion forced a bracket reset", t.id);
        settle(t, t.matches.len() - 1)
    }

    fn champion(&self, t: &Tournament) -> Option<ParticipantId> {
        t.match_by_key(grand_final(2))
            .or_else(|| t.match_by_key(grand_final(1)))
            .and_then(|m| m.winner)
    }
}

impl FormatRules for DoubleElimination {
    fn build(&self, seeded: &[Seeded], _options: &BracketOptions) -> TournamentResult<BuiltBracket> {
        let rounds = ceil_log2(seeded.len() as u32);
        let layout = BracketLayout {
            entrants: seeded.len() as u32,
            winners_rounds: rounds,
            losers_rounds: 2 * rounds.saturating_sub(1),
            pool_rounds: 0,
        };

        let mut matches = winners_rows(seeded, rounds);
        for round in 1..=layout.losers_rounds {
            for sequence in 0..losers_round_rows(&layout, round) {
                matches.push(awaiting(BracketSide::Losers, round, sequence));
            }
        }
        matches.push(awaiting(BracketSide::GrandFinal, 1, 0));
        Ok(BuiltBracket { layout, matches })
    }

    fn winner_target(&self, layout: &BracketLayout, key: MatchKey) -> Option<SlotRef> {
        match key.side {
            BracketSide::Winners if key.round < layout.winners_rounds => {
                Some(halve(key, BracketSide::Winners, key.round + 1))
            }
            BracketSide::Winners => Some(SlotRef {
                key: grand_final(1),
                slot: 0,
            }),
            BracketSide::Losers if key.round < layout.losers_rounds => {
                if key.round % 2 == 1 {
                    // survivors meet the next winners-bracket dropouts one-to-one
                    Some(SlotRef {
                        key: MatchKey::new(BracketSide::Losers, key.round + 1, key.sequence),
                        slot: 0,
                    })
                } else {
                    Some(halve(key, BracketSide::Losers, key.round + 1))
                }
            }
            BracketSide::Losers => Some(SlotRef {
                key: grand_final(1),
                slot: 1,
            }),
            BracketSide::GrandFinal | BracketSide::Pool => None,
        }
    }

    fn loser_target(&self, layout: &BracketLayout, key: MatchKey) -> Option<SlotRef> {
        if key.side != BracketSide::Winners {
            return None;
        }
        if layout.losers_rounds == 0 {
            return Some(SlotRef {
                key: grand_final(1),
                slot: 1,
            });
        }
        if key.round == 1 {
            Some(halve(key, BracketSide::Losers, 1))
        } else {
            Some(SlotRef {
                key: MatchKey::new(BracketSide::Losers, 2 * (key.round - 1), key.sequence),
                slot: 1,
            })
        }
    }

    fn on_match_complete(&self, t: &mut Tournament, idx: usize) -> TournamentResult<()> {
        let layout = t.layout()?;
        let (key, winner, loser, losers_champion) = {
            let m = &t.matches[idx];
            (m.key, m.winner, m.loser(), m.slots[1].entrant.participant())
        };
        let final_stage = layout.losers_rounds + 1;

        match key.side {
            BracketSide::Winners => {}
            BracketSide::Losers => {
                if let Some(loser) = loser {
                    eliminate(t, loser, key.round)?;
                }
            }
            BracketSide::GrandFinal => {
                if key.round == 1 && t.options.bracket_reset && winner.is_some() && winner == losers_champion {
                    if let (Some(wb), Some(lb)) = (loser, winner) {
                        return self.create_reset(t, wb, lb);
                    }
                }
                if let Some(loser) = loser {
                    eliminate(t, loser, final_stage)?;
                }
            }
            BracketSide::Pool => {
                return Err(integrity_violation(format!(
                    "tournament {}: pool match {:?} in a double-elimination bracket",
                    t.id, key
                )));
            }
        }

        if let Some(target) = self.winner_target(&layout, key) {
            claim_slot(t, target, winner)?;
        }
        if let Some(target) = self.loser_target(&layout, key) {
            claim_slot(t, target, loser)?;
        }
        Ok(())
    }

    fn is_complete(&self, t: &Tournament) -> bool {
        let first = t.match_by_key(grand_final(1));
        let reset = t.match_by_key(grand_final(2));
        match (first, reset) {
            (Some(first), None) => first.is_terminal(),
            (Some(first), Some(reset)) => first.is_terminal() && reset.is_terminal(),
            _ => false,
        }
    }

    fn placements(&self, t: &Tournament) -> Vec<(ParticipantId, u32)> {
        stage_placements(t, self.champion(t))
    }

    fn exit_stage(&self, layout: &BracketLayout, key: MatchKey) -> Option<u32> {
        match key.side {
            BracketSide::Winners => Some(2 * (key.round - 1)),
            BracketSide::Losers => Some(key.round),
            BracketSide::GrandFinal => Some(layout.losers_rounds + 1),
            BracketSide::Pool => None,
        }
    }

    fn override_locked(&self, t: &Tournament, idx: usize) -> bool {
        let Some(layout) = t.layout else {
            return true;
        };
        let key = t.matches[idx].key;
        if key == grand_final(1) {
            if let Some(reset) = t.match_by_key(grand_final(2)) {
                return !reset.status.is_unstarted();
            }
        }
        dependents_started(
            t,
            &[
                self.winner_target(&layout, key),
                self.loser_target(&layout, key),
            ],
        )
    }

    /// The bracket reset only exists because of the first grand final's result.
    fn retract(&self, t: &mut Tournament, idx: usize) -> TournamentResult<()> {
        if t.matches[idx].key == grand_final(1) {
            if let Some(reset) = t.match_index(grand_final(2)) {
                t.matches.remove(reset);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(entrants: u32) -> BracketLayout {
        let rounds = ceil_log2(entrants);
        BracketLayout {
            entrants,
            winners_rounds: rounds,
            losers_rounds: 2 * rounds.saturating_sub(1),
            pool_rounds: 0,
        }
    }

    #[test]
    fn seed_positions_keep_top_seeds_apart() {
        assert_eq!(seed_positions(2), vec![1, 2]);
        assert_eq!(seed_positions(4), vec![1, 4, 2, 3]);
        assert_eq!(seed_positions(8), vec![1, 8, 4, 5, 2, 7, 3, 6]);
    }

    #[test]
    fn winners_feed_halves_sequence() {
        let l = layout(8);
        let target = SingleElimination
            .winner_target(&l, MatchKey::new(BracketSide::Winners, 1, 3))
            .unwrap();
        assert_eq!(target.key, MatchKey::new(BracketSide::Winners, 2, 1));
        assert_eq!(target.slot, 1);
        assert!(SingleElimination
            .winner_target(&l, MatchKey::new(BracketSide::Winners, 3, 0))
            .is_none());
    }

    #[test]
    fn losers_bracket_row_counts() {
        let l = layout(16);
        let rows: Vec<u32> = (1..=l.losers_rounds).map(|r| losers_round_rows(&l, r)).collect();
        assert_eq!(rows, vec![4, 4, 2, 2, 1, 1]);
    }

    #[test]
    fn double_elimination_drop_targets() {
        let l = layout(8);
        let rules = DoubleElimination;
        let first = rules
            .loser_target(&l, MatchKey::new(BracketSide::Winners, 1, 3))
            .unwrap();
        assert_eq!(first.key, MatchKey::new(BracketSide::Losers, 1, 1));
        assert_eq!(first.slot, 1);

        let semi = rules
            .loser_target(&l, MatchKey::new(BracketSide::Winners, 2, 1))
            .unwrap();
        assert_eq!(semi.key, MatchKey::new(BracketSide::Losers, 2, 1));
        assert_eq!(semi.slot, 1);

        let final_drop = rules
            .loser_target(&l, MatchKey::new(BracketSide::Winners, 3, 0))
            .unwrap();
        assert_eq!(final_drop.key, MatchKey::new(BracketSide::Losers, 4, 0));

        let losers_final = rules
            .winner_target(&l, MatchKey::new(BracketSide::Losers, 4, 0))
            .unwrap();
        assert_eq!(losers_final.key, grand_final(1));
        assert_eq!(losers_final.slot, 1);
    }

    #[test]
    fn two_entrant_double_elimination_drops_straight_to_grand_final() {
        let l = layout(2);
        assert_eq!(l.losers_rounds, 0);
        let drop = DoubleElimination
            .loser_target(&l, MatchKey::new(BracketSide::Winners, 1, 0))
            .unwrap();
        assert_eq!(drop.key, grand_final(1));
        assert_eq!(drop.slot, 1);
    }
}
