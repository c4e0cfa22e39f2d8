//! Integration tests for round robin: schedule shape, draws, standings tie-breaks, void and withdrawal.

use bracket_engine::{
    build_bracket, cancel_match, final_placements, report_result, standings, void_match,
    withdraw_participant, BracketOptions, GameMatch, MatchStatus, ParticipantExit, ParticipantId,
    ParticipantStatus, PointsTable, ResultReport, SeedingPolicy, Tournament, TournamentError,
    TournamentFormat, TournamentStatus,
};
use std::collections::{BTreeSet, HashMap};

fn built(names: &[&str], options: BracketOptions) -> (Tournament, Vec<ParticipantId>) {
    let mut t = Tournament::new("Club League", TournamentFormat::RoundRobin, None);
    t.publish().unwrap();
    t.open_registration().unwrap();
    let ids: Vec<ParticipantId> = names
        .iter()
        .map(|name| t.register_participant(*name, None).unwrap())
        .collect();
    build_bracket(
        &mut t,
        &[],
        TournamentFormat::RoundRobin,
        SeedingPolicy::AsListed,
        options,
    )
    .unwrap();
    (t, ids)
}

/// Report every READY match; `pick` names the winner, None for a draw.
fn play_out(t: &mut Tournament, pick: impl Fn(ParticipantId, ParticipantId) -> Option<ParticipantId>) {
    let ready: Vec<GameMatch> = t
        .matches
        .iter()
        .filter(|m| m.status == MatchStatus::Ready)
        .cloned()
        .collect();
    for m in ready {
        let ids: Vec<_> = m.participants().collect();
        let (x, y) = (ids[0], ids[1]);
        let scores = match pick(x, y) {
            Some(w) if w == x => [(x, 2), (y, 0)],
            Some(_) => [(x, 0), (y, 2)],
            None => [(x, 1), (y, 1)],
        };
        report_result(t, m.id, &ResultReport::user(&scores)).unwrap();
    }
}

#[test]
fn five_participants_meet_everyone_once() {
    let (t, ids) = built(&["A", "B", "C", "D", "E"], BracketOptions::default());
    assert_eq!(t.matches.len(), 10);
    assert_eq!(t.layout.unwrap().pool_rounds, 5);
    assert!(t.matches.iter().all(|m| m.status == MatchStatus::Ready));

    let mut pairs = BTreeSet::new();
    let mut played: HashMap<ParticipantId, usize> = HashMap::new();
    for m in &t.matches {
        let p: Vec<_> = m.participants().collect();
        assert!(pairs.insert((p[0].min(p[1]), p[0].max(p[1]))));
        for id in p {
            *played.entry(id).or_default() += 1;
        }
    }
    assert!(ids.iter().all(|id| played[id] == 4));

    // one idle participant per round
    for round in 1..=5 {
        let busy = t.matches.iter().filter(|m| m.key.round == round).count();
        assert_eq!(busy, 2);
    }
}

#[test]
fn lower_seed_winning_everything_ranks_by_seed() {
    let (mut t, ids) = built(&["A", "B", "C", "D", "E"], BracketOptions::default());
    let seed = |id: ParticipantId| ids.iter().position(|x| *x == id);
    play_out(&mut t, |x, y| Some(if seed(x) < seed(y) { x } else { y }));

    assert_eq!(t.status, TournamentStatus::Completed);
    let table = standings(&t);
    let points: Vec<_> = table.iter().map(|row| row.points).collect();
    assert_eq!(points, vec![12, 9, 6, 3, 0]);

    let placements: Vec<_> = final_placements(&t)
        .unwrap()
        .into_iter()
        .map(|p| (p.participant_id, p.placement))
        .collect();
    let expected: Vec<_> = ids.iter().copied().zip(1u32..).collect();
    assert_eq!(placements, expected);
    assert_eq!(t.participant(ids[0]).unwrap().status, ParticipantStatus::Winner);
    assert_eq!(t.participant(ids[4]).unwrap().status, ParticipantStatus::Active);
}

#[test]
fn draws_need_a_draw_value() {
    let (mut t, ids) = built(&["A", "B"], BracketOptions::default());
    let id = t.matches[0].id;
    assert_eq!(
        report_result(&mut t, id, &ResultReport::user(&[(ids[0], 1), (ids[1], 1)])),
        Err(TournamentError::DrawNotAllowed)
    );
    assert_eq!(t.matches[0].status, MatchStatus::Ready);

    let options = BracketOptions {
        points: PointsTable {
            win: 3,
            draw: Some(1),
            loss: 0,
        },
        ..BracketOptions::default()
    };
    let (mut t, ids) = built(&["A", "B"], options);
    let id = t.matches[0].id;
    let m = report_result(&mut t, id, &ResultReport::user(&[(ids[0], 1), (ids[1], 1)])).unwrap();
    assert_eq!(m.status, MatchStatus::Completed);
    assert!(m.is_draw());
    assert!(standings(&t).iter().all(|row| row.draws == 1 && row.points == 1));
    assert_eq!(t.status, TournamentStatus::Completed);
}

#[test]
fn head_to_head_outranks_seed() {
    let (mut t, ids) = built(&["A", "B", "C", "D"], BracketOptions::default());
    let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
    let beats = [(b, a), (a, c), (a, d), (c, b), (b, d), (d, c)];
    play_out(&mut t, |x, y| {
        beats
            .iter()
            .find(|(w, l)| (*w == x && *l == y) || (*w == y && *l == x))
            .map(|(w, _)| *w)
    });

    let order: Vec<_> = standings(&t).iter().map(|row| row.participant_id).collect();
    // A and B level on 6 (B won their game); C and D level on 3 (D won theirs)
    assert_eq!(order, vec![b, a, d, c]);
    let table = standings(&t);
    assert_eq!(table[0].tie_break.head_to_head, 3);
    assert_eq!(table[1].tie_break.head_to_head, 0);
}

#[test]
fn voided_match_stops_counting() {
    let (mut t, ids) = built(&["A", "B", "C"], BracketOptions::default());
    let first = t
        .matches
        .iter()
        .find(|m| m.involves(ids[0]) && m.involves(ids[1]))
        .unwrap()
        .id;
    report_result(&mut t, first, &ResultReport::user(&[(ids[0], 3), (ids[1], 1)])).unwrap();
    assert_eq!(standings(&t)[0].points, 3);

    let voided = void_match(&mut t, first).unwrap();
    assert_eq!(voided.status, MatchStatus::Void);
    assert!(standings(&t).iter().all(|row| row.points == 0));
    assert_eq!(void_match(&mut t, first), Err(TournamentError::ResultLocked));

    let other = t.matches.iter().find(|m| m.status == MatchStatus::Ready).unwrap().id;
    assert_eq!(cancel_match(&mut t, other).unwrap().status, MatchStatus::Canceled);
}

#[test]
fn withdrawal_cancels_open_matches() {
    let (mut t, ids) = built(&["A", "B", "C", "D"], BracketOptions::default());
    withdraw_participant(&mut t, ids[3], ParticipantExit::Withdrawn).unwrap();
    let canceled = t
        .matches
        .iter()
        .filter(|m| m.status == MatchStatus::Canceled)
        .count();
    assert_eq!(canceled, 3);

    play_out(&mut t, |x, _| Some(x));
    assert_eq!(t.status, TournamentStatus::Completed);
    let placements = final_placements(&t).unwrap();
    assert_eq!(placements.len(), 4);
    assert_eq!(placements[3].participant_id, ids[3]);
}
