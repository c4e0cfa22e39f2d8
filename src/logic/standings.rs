//! Standings for pooled formats: win/draw/loss records, points, tie-breaks and Swiss pairing.

use crate::models::{
    GameMatch, MatchStatus, Participant, ParticipantId, ParticipantStatus, PointsTable, Tournament,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Secondary sort keys after points: head-to-head points inside the tied group (desc), then seed (asc).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TieBreakKey {
    pub head_to_head: u32,
    pub seed: u32,
}

/// One participant's line in the standings table.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub rank: u32,
    pub participant_id: ParticipantId,
    pub name: String,
    pub status: ParticipantStatus,
    /// Contested matches decided (byes excluded).
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub byes: u32,
    pub points: u32,
    pub tie_break: TieBreakKey,
}

impl StandingsRow {
    fn new(p: &Participant) -> Self {
        Self {
            rank: 0,
            participant_id: p.id,
            name: p.name.clone(),
            status: p.status,
            played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            byes: 0,
            points: 0,
            tie_break: TieBreakKey {
                head_to_head: 0,
                seed: p.seed_key(),
            },
        }
    }
}

/// Pairs for the next Swiss round and the participant sitting it out, if any.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Pairing {
    pub pairs: Vec<(ParticipantId, ParticipantId)>,
    pub bye: Option<ParticipantId>,
}

fn earned(m: &GameMatch, participant_id: ParticipantId, table: &PointsTable) -> u32 {
    match m.winner {
        Some(winner) if winner == participant_id => table.win,
        Some(_) => table.loss,
        None => table.draw.unwrap_or(0),
    }
}

/// Both participants of a decided, contested match.
fn contested(m: &GameMatch) -> Option<(ParticipantId, ParticipantId)> {
    if m.status != MatchStatus::Completed || m.bye {
        return None;
    }
    match (m.slots[0].entrant.participant(), m.slots[1].entrant.participant()) {
        (Some(a), Some(b)) => Some((a, b)),
        _ => None,
    }
}

/// Current standings, best first. Recomputed from the match rows on every call.
pub fn standings(t: &Tournament) -> Vec<StandingsRow> {
    let table = t.options.points;
    let mut rows: Vec<StandingsRow> = t
        .seeded_participants()
        .into_iter()
        .map(StandingsRow::new)
        .collect();
    let position: HashMap<ParticipantId, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| (row.participant_id, i))
        .collect();

    for m in &t.matches {
        if m.status != MatchStatus::Completed {
            continue;
        }
        if m.bye {
            if let Some(row) = m.winner.and_then(|w| position.get(&w)).map(|&i| &mut rows[i]) {
                row.byes += 1;
                row.wins += 1;
                row.points += table.win;
            }
            continue;
        }
        let Some((a, b)) = contested(m) else {
            continue;
        };
        for id in [a, b] {
            let Some(&i) = position.get(&id) else {
                continue;
            };
            let row = &mut rows[i];
            row.played += 1;
            row.points += earned(m, id, &table);
            match m.winner {
                Some(w) if w == id => row.wins += 1,
                Some(_) => row.losses += 1,
                None => row.draws += 1,
            }
        }
    }

    // head-to-head only counts games between participants on the same points total
    let totals: Vec<u32> = rows.iter().map(|r| r.points).collect();
    for m in &t.matches {
        let Some((a, b)) = contested(m) else {
            continue;
        };
        let (Some(&ia), Some(&ib)) = (position.get(&a), position.get(&b)) else {
            continue;
        };
        if totals[ia] == totals[ib] {
            rows[ia].tie_break.head_to_head += earned(m, a, &table);
            rows[ib].tie_break.head_to_head += earned(m, b, &table);
        }
    }

    rows.sort_by(|x, y| {
        y.points
            .cmp(&x.points)
            .then(y.tie_break.head_to_head.cmp(&x.tie_break.head_to_head))
            .then(x.tie_break.seed.cmp(&y.tie_break.seed))
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i as u32 + 1;
    }
    rows
}

fn unordered(a: ParticipantId, b: ParticipantId) -> (ParticipantId, ParticipantId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Pairs that already met in a scheduled, non-void match.
fn played_pairs(t: &Tournament) -> BTreeSet<(ParticipantId, ParticipantId)> {
    t.matches
        .iter()
        .filter(|m| m.status != MatchStatus::Void)
        .filter_map(|m| {
            let mut ids = m.participants();
            Some(unordered(ids.next()?, ids.next()?))
        })
        .collect()
}

/// Swiss pairing for the next round.
///
/// Active participants are taken in standings order so neighbours have the closest point totals.
/// With an odd count the lowest-standing participant without a previous bye sits out. Each
/// participant is then paired with the next one they have not met, falling back to the nearest
/// (a rematch) when everyone left has already been played.
pub fn next_pairing(t: &Tournament) -> Pairing {
    let met = played_pairs(t);
    let had_bye: BTreeSet<ParticipantId> = t
        .matches
        .iter()
        .filter(|m| m.bye)
        .filter_map(|m| m.winner)
        .collect();

    let mut pool: Vec<ParticipantId> = standings(t)
        .into_iter()
        .filter(|row| row.status == ParticipantStatus::Active)
        .map(|row| row.participant_id)
        .collect();

    let mut pairing = Pairing::default();
    if pool.len() % 2 == 1 {
        let pick = pool
            .iter()
            .rposition(|id| !had_bye.contains(id))
            .unwrap_or(pool.len() - 1);
        pairing.bye = Some(pool.remove(pick));
    }

    while pool.len() >= 2 {
        let first = pool.remove(0);
        let opponent = pool
            .iter()
            .position(|other| !met.contains(&unordered(first, *other)))
            .unwrap_or(0);
        pairing.pairs.push((first, pool.remove(opponent)));
    }
    pairing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BracketSide, MatchKey, MatchSlot, TournamentFormat};

    fn pooled(names: &[&str]) -> (Tournament, Vec<ParticipantId>) {
        let mut t = Tournament::new("League night", TournamentFormat::RoundRobin, None);
        t.publish().unwrap();
        let ids: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let id = t.register_participant(*name, None).unwrap();
                let p = t.participant_mut(id).unwrap();
                p.seed = Some(i as u32 + 1);
                p.status = ParticipantStatus::Active;
                id
            })
            .collect();
        (t, ids)
    }

    fn decided(t: &mut Tournament, round: u32, a: ParticipantId, b: ParticipantId, winner: Option<ParticipantId>) {
        let sequence = t.matches.len() as u32;
        let mut m = GameMatch::new(
            MatchKey::new(BracketSide::Pool, round, sequence),
            [MatchSlot::filled(a, t.seed_of(a)), MatchSlot::filled(b, t.seed_of(b))],
        );
        m.status = MatchStatus::Completed;
        m.winner = winner;
        t.matches.push(m);
    }

    #[test]
    fn points_then_head_to_head_then_seed() {
        let (mut t, ids) = pooled(&["Ana", "Ben", "Cleo"]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        // three-way cycle: everyone on 3 points; head-to-head is level too, so seed decides
        decided(&mut t, 1, a, b, Some(b));
        decided(&mut t, 2, b, c, Some(c));
        decided(&mut t, 3, c, a, Some(a));

        let table = standings(&t);
        let order: Vec<_> = table.iter().map(|r| r.participant_id).collect();
        assert_eq!(order, vec![a, b, c]);
        assert!(table.iter().all(|r| r.points == 3 && r.tie_break.head_to_head == 3));
        assert_eq!(table[2].rank, 3);
    }

    #[test]
    fn head_to_head_breaks_a_two_way_tie() {
        let (mut t, ids) = pooled(&["Ana", "Ben", "Cleo", "Dev"]);
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
        decided(&mut t, 1, b, a, Some(b));
        decided(&mut t, 1, c, d, Some(c));
        decided(&mut t, 2, a, d, Some(a));
        decided(&mut t, 2, c, b, Some(c));
        decided(&mut t, 3, a, c, Some(a));
        decided(&mut t, 3, b, d, Some(b));
        // a, b and c are level on 6 points; inside that group b beat a, c beat b, a beat c
        let table = standings(&t);
        assert_eq!(table[0].points, 6);
        assert_eq!(table[3].participant_id, d);
        assert_eq!(table[3].losses, 3);
    }

    #[test]
    fn draws_score_the_draw_value() {
        let (mut t, ids) = pooled(&["Ana", "Ben"]);
        t.options.points.draw = Some(1);
        decided(&mut t, 1, ids[0], ids[1], None);
        let table = standings(&t);
        assert!(table.iter().all(|r| r.draws == 1 && r.points == 1));
    }

    #[test]
    fn pairing_avoids_rematches_and_rotates_the_bye() {
        let (mut t, ids) = pooled(&["Ana", "Ben", "Cleo", "Dev", "Eli"]);
        decided(&mut t, 1, ids[0], ids[2], Some(ids[0]));
        decided(&mut t, 1, ids[1], ids[3], Some(ids[1]));
        let mut bye = GameMatch::new(
            MatchKey::new(BracketSide::Pool, 1, 2),
            [MatchSlot::filled(ids[4], Some(5)), MatchSlot::vacant()],
        );
        bye.status = MatchStatus::Completed;
        bye.winner = Some(ids[4]);
        bye.bye = true;
        t.matches.push(bye);

        let pairing = next_pairing(&t);
        assert_eq!(pairing.pairs.len(), 2);
        assert_ne!(pairing.bye, Some(ids[4]));
        let met = played_pairs(&t);
        for (x, y) in &pairing.pairs {
            assert!(!met.contains(&unordered(*x, *y)));
        }
    }
}
