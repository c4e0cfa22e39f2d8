//! Integration tests for single elimination: build shape, byes, progression, withdrawals, placements.

use bracket_engine::logic::claim_slot;
use bracket_engine::logic::SlotRef;
use bracket_engine::{
    advance, build_bracket, final_placements, report_result, withdraw_participant, BracketOptions,
    BracketSide, GameMatch, MatchKey, MatchSlot, MatchStatus, ParticipantExit, ParticipantId,
    ParticipantStatus, ResultReport, SeedingPolicy, SlotEntrant, Tournament, TournamentError,
    TournamentFormat, TournamentStatus,
};

fn built(names: &[&str]) -> (Tournament, Vec<ParticipantId>) {
    let mut t = Tournament::new("Friday Open", TournamentFormat::SingleElimination, None);
    t.publish().unwrap();
    t.open_registration().unwrap();
    let ids: Vec<ParticipantId> = names
        .iter()
        .map(|name| t.register_participant(*name, None).unwrap())
        .collect();
    build_bracket(
        &mut t,
        &[],
        TournamentFormat::SingleElimination,
        SeedingPolicy::AsListed,
        BracketOptions::default(),
    )
    .unwrap();
    (t, ids)
}

fn winners(round: u32, sequence: u32) -> MatchKey {
    MatchKey::new(BracketSide::Winners, round, sequence)
}

fn at(t: &Tournament, key: MatchKey) -> &GameMatch {
    t.match_by_key(key).unwrap()
}

fn report_win(t: &mut Tournament, key: MatchKey, winner: ParticipantId, score: (u32, u32)) -> GameMatch {
    let m = at(t, key).clone();
    let loser = m.participants().find(|p| *p != winner).unwrap();
    report_result(t, m.id, &ResultReport::user(&[(winner, score.0), (loser, score.1)])).unwrap()
}

#[test]
fn four_participants_semis_then_final() {
    let (mut t, ids) = built(&["A", "B", "C", "D"]);
    let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);

    assert_eq!(t.matches.len(), 3);
    let semi_1: Vec<_> = at(&t, winners(1, 0)).participants().collect();
    let semi_2: Vec<_> = at(&t, winners(1, 1)).participants().collect();
    assert_eq!(semi_1, vec![a, d]);
    assert_eq!(semi_2, vec![b, c]);
    let final_match = at(&t, winners(2, 0));
    assert_eq!(final_match.status, MatchStatus::Pending);
    assert!(final_match.slots.iter().all(|s| s.entrant == SlotEntrant::Awaiting));

    // the semis are announced once
    assert_eq!(advance(&mut t).unwrap().newly_ready_matches.len(), 2);

    report_win(&mut t, winners(1, 0), a, (2, 0));
    report_win(&mut t, winners(1, 1), b, (2, 1));
    let step = advance(&mut t).unwrap();
    assert_eq!(step.status, TournamentStatus::InProgress);
    assert_eq!(step.newly_ready_matches.len(), 1);
    let ready = &step.newly_ready_matches[0];
    assert_eq!(ready.key, winners(2, 0));
    assert_eq!(ready.participants().collect::<Vec<_>>(), vec![a, b]);

    report_win(&mut t, winners(2, 0), a, (2, 1));
    assert_eq!(t.status, TournamentStatus::Completed);

    let placements: Vec<_> = final_placements(&t)
        .unwrap()
        .into_iter()
        .map(|p| (p.participant_id, p.placement))
        .collect();
    assert_eq!(placements, vec![(a, 1), (b, 2), (c, 3), (d, 3)]);
    assert_eq!(t.participant(a).unwrap().status, ParticipantStatus::Winner);
    assert_eq!(t.participant(d).unwrap().status, ParticipantStatus::Eliminated);
    assert_eq!(
        t.participants
            .iter()
            .filter(|p| p.status == ParticipantStatus::Winner)
            .count(),
        1
    );
}

#[test]
fn five_participants_give_byes_to_top_seeds() {
    let (t, ids) = built(&["A", "B", "C", "D", "E"]);

    // bracket of 8: seeds 1, 2 and 3 sit out round 1, seed 4 meets seed 5
    let round_1: Vec<&GameMatch> = t.matches.iter().filter(|m| m.key.round == 1).collect();
    assert_eq!(round_1.len(), 4);
    let byes: Vec<_> = round_1.iter().filter(|m| m.bye).map(|m| m.winner.unwrap()).collect();
    assert_eq!(byes, vec![ids[0], ids[1], ids[2]]);
    assert!(round_1
        .iter()
        .filter(|m| m.bye)
        .all(|m| m.status == MatchStatus::Completed));
    let contested = at(&t, winners(1, 1));
    assert_eq!(contested.status, MatchStatus::Ready);
    assert_eq!(contested.participants().collect::<Vec<_>>(), vec![ids[3], ids[4]]);

    // byes have already advanced
    assert_eq!(at(&t, winners(2, 0)).slots[0].entrant, SlotEntrant::Filled(ids[0]));
    assert_eq!(at(&t, winners(2, 1)).status, MatchStatus::Ready);

    assert_eq!(t.matches.len(), 7);
    assert_eq!(t.matches.iter().filter(|m| !m.bye).count(), 4);
}

#[test]
fn draw_is_rejected_and_match_stays_in_progress() {
    let (mut t, ids) = built(&["A", "B"]);
    let id = at(&t, winners(1, 0)).id;
    bracket_engine::start_match(&mut t, id).unwrap();

    let result = report_result(&mut t, id, &ResultReport::user(&[(ids[0], 1), (ids[1], 1)]));
    assert_eq!(result, Err(TournamentError::DrawNotAllowed));
    let m = at(&t, winners(1, 0));
    assert_eq!(m.status, MatchStatus::InProgress);
    assert!(m.slots.iter().all(|s| s.score.is_none()));
}

#[test]
fn first_semi_double_withdrawal_hands_the_title_over() {
    let (mut t, ids) = built(&["A", "B", "C", "D"]);
    let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);

    withdraw_participant(&mut t, a, ParticipantExit::Withdrawn).unwrap();
    let semi = at(&t, winners(1, 0));
    assert_eq!(semi.status, MatchStatus::Canceled);
    assert_eq!(semi.winner, Some(d));
    assert_eq!(at(&t, winners(2, 0)).slots[0].entrant, SlotEntrant::Filled(d));

    withdraw_participant(&mut t, d, ParticipantExit::Disqualified).unwrap();
    assert_eq!(at(&t, winners(2, 0)).slots[0].entrant, SlotEntrant::Vacant);
    assert_eq!(at(&t, winners(2, 0)).status, MatchStatus::Pending);

    report_win(&mut t, winners(1, 1), b, (3, 0));
    let final_match = at(&t, winners(2, 0));
    assert_eq!(final_match.status, MatchStatus::Completed);
    assert!(final_match.bye);
    assert_eq!(final_match.winner, Some(b));
    assert_eq!(t.status, TournamentStatus::Completed);

    let placements: Vec<_> = final_placements(&t)
        .unwrap()
        .into_iter()
        .map(|p| (p.participant_id, p.placement))
        .collect();
    assert_eq!(placements, vec![(b, 1), (d, 2), (a, 3), (c, 3)]);
    assert_eq!(t.participant(a).unwrap().status, ParticipantStatus::Withdrawn);
    assert_eq!(t.participant(d).unwrap().status, ParticipantStatus::Disqualified);
    assert!(advance(&mut t).is_ok());
}

#[test]
fn withdrawal_cascade_across_a_quarter_of_the_bracket() {
    let (mut t, ids) = built(&["A", "B", "C", "D", "E", "F", "G", "H"]);
    let (a, b, c, d, h) = (ids[0], ids[1], ids[2], ids[3], ids[7]);

    // A withdraws, H advances; then H withdraws from the pending quarter-final
    withdraw_participant(&mut t, a, ParticipantExit::Withdrawn).unwrap();
    withdraw_participant(&mut t, h, ParticipantExit::Withdrawn).unwrap();
    assert_eq!(at(&t, winners(2, 0)).slots[0].entrant, SlotEntrant::Vacant);

    // whoever wins D v E walks through the quarter-final
    report_win(&mut t, winners(1, 1), d, (2, 0));
    let quarter = at(&t, winners(2, 0));
    assert!(quarter.bye);
    assert_eq!(quarter.winner, Some(d));
    assert_eq!(at(&t, winners(3, 0)).slots[0].entrant, SlotEntrant::Filled(d));

    report_win(&mut t, winners(1, 2), b, (2, 0));
    report_win(&mut t, winners(1, 3), c, (2, 0));
    report_win(&mut t, winners(2, 1), b, (2, 0));
    report_win(&mut t, winners(3, 0), d, (2, 1));
    assert_eq!(t.status, TournamentStatus::Completed);

    let placements = final_placements(&t).unwrap();
    assert_eq!(placements[0].participant_id, d);
    assert_eq!(placements[1].participant_id, b);
    // H withdrew in the quarter-finals, A in round 1
    let h_place = placements.iter().find(|p| p.participant_id == h).unwrap().placement;
    let a_place = placements.iter().find(|p| p.participant_id == a).unwrap().placement;
    assert_eq!(h_place, 3);
    assert_eq!(a_place, 5);
}

#[test]
fn withdrawal_before_build_keeps_participant_out() {
    let mut t = Tournament::new("Cup", TournamentFormat::SingleElimination, None);
    t.publish().unwrap();
    t.open_registration().unwrap();
    let ids: Vec<_> = ["A", "B", "C"]
        .iter()
        .map(|n| t.register_participant(*n, None).unwrap())
        .collect();
    withdraw_participant(&mut t, ids[2], ParticipantExit::Withdrawn).unwrap();
    build_bracket(
        &mut t,
        &[],
        TournamentFormat::SingleElimination,
        SeedingPolicy::AsListed,
        BracketOptions::default(),
    )
    .unwrap();
    assert_eq!(t.matches.len(), 1);
    assert!(!t.participant(ids[2]).unwrap().in_bracket());
}

#[test]
fn advance_is_idempotent() {
    let (mut t, _) = built(&["A", "B", "C", "D", "E", "F"]);
    let first = advance(&mut t).unwrap();
    assert!(!first.newly_ready_matches.is_empty());
    assert!(advance(&mut t).unwrap().newly_ready_matches.is_empty());
    assert!(advance(&mut t).unwrap().newly_ready_matches.is_empty());
}

#[test]
fn tampered_slot_is_an_integrity_violation() {
    let (mut t, ids) = built(&["A", "B", "C", "D"]);
    let idx = t.match_index(winners(2, 0)).unwrap();
    t.matches[idx].slots[0] = MatchSlot::filled(ids[2], Some(3));

    assert!(matches!(
        advance(&mut t),
        Err(TournamentError::IntegrityViolation(_))
    ));
    // not repaired
    assert_eq!(t.matches[idx].slots[0].entrant, SlotEntrant::Filled(ids[2]));
}

#[test]
fn claiming_a_settled_slot_is_an_integrity_violation() {
    let (mut t, ids) = built(&["A", "B", "C", "D"]);
    report_win(&mut t, winners(1, 0), ids[0], (2, 0));
    let again = claim_slot(
        &mut t,
        SlotRef {
            key: winners(2, 0),
            slot: 0,
        },
        Some(ids[3]),
    );
    assert!(matches!(again, Err(TournamentError::IntegrityViolation(_))));
}

#[test]
fn placements_require_completion() {
    let (t, _) = built(&["A", "B", "C"]);
    assert_eq!(final_placements(&t), Err(TournamentError::NotCompleted));
}

#[test]
fn format_is_locked_once_built() {
    let (mut t, _) = built(&["A", "B"]);
    assert_eq!(
        t.set_format(TournamentFormat::RoundRobin),
        Err(TournamentError::FormatLocked)
    );
}
