use super::common::*;
use crate::festival::domain::Grade;
use crate::festival::memory::{InMemoryFestivalStore, InMemoryNotifier};
use crate::festival::scoring::{HouseScore, ScoringError};

fn score_of(festival: &Festival<InMemoryFestivalStore, InMemoryNotifier>) -> Vec<(String, u32)> {
    festival
        .scoring
        .compute_house_scores()
        .expect("scores")
        .into_iter()
        .map(|score| (score.house_id.0, score.score))
        .collect()
}

#[test]
fn houses_without_entries_score_zero() {
    let festival = build_festival(1, 1, 1);
    assert_eq!(
        score_of(&festival),
        vec![
            ("red".to_string(), 0),
            ("blue".to_string(), 0),
            ("green".to_string(), 0)
        ]
    );
}

#[test]
fn winner_without_attendance_scores_nothing() {
    let festival = build_festival(1, 1, 1);
    graded_entry(&festival, "amal", SOLO_DANCE, Grade::Winner, false);
    graded_entry(&festival, "farid", SOLO_DANCE, Grade::SecondRunnerUp, true);

    assert_eq!(
        score_of(&festival),
        vec![
            ("red".to_string(), 0),
            ("blue".to_string(), 3),
            ("green".to_string(), 0)
        ]
    );
}

#[test]
fn team_scores_once_for_its_house() {
    let festival = build_festival(1, 1, 1);
    let view = festival
        .admission
        .register_single(&uid("amal"), team(GROUP_SONG, "Red Chorus", &["binu", "chitra", "dev"]))
        .expect("team admitted");
    festival.store.mark_attendance(&view.registration_id, true);
    festival
        .results
        .set_grade(&view.registration_id, Some(Grade::Winner))
        .expect("graded");

    assert_eq!(score_of(&festival)[0], ("red".to_string(), 5));
}

#[test]
fn cancelled_entries_stop_scoring() {
    let festival = build_festival(1, 1, 1);
    let id = graded_entry(&festival, "amal", SOLO_DANCE, Grade::Winner, true);
    assert_eq!(score_of(&festival)[0].1, 5);

    festival.results.cancel(&id).expect("cancelled");
    assert_eq!(score_of(&festival)[0].1, 0);
}

#[test]
fn tied_leaders_share_the_podium() {
    let festival = build_festival(2, 1, 1);
    festival.store.insert_user(user("ivy", Some("green")));
    festival.store.insert_user(user("jo", Some("green")));

    graded_entry(&festival, "amal", SOLO_DANCE, Grade::Winner, true);
    graded_entry(&festival, "binu", SOLO_DANCE, Grade::Winner, true);
    graded_entry(&festival, "farid", SOLO_DANCE, Grade::Winner, true);
    graded_entry(&festival, "gita", SOLO_DANCE, Grade::Winner, true);
    graded_entry(&festival, "ivy", SOLO_DANCE, Grade::FirstRunnerUp, true);
    graded_entry(&festival, "jo", SOLO_DANCE, Grade::SecondRunnerUp, true);

    let board = festival.scoring.leaderboard().expect("leaderboard");
    fn ids(tier: &[HouseScore]) -> Vec<String> {
        tier.iter().map(|house| house.house_id.0.clone()).collect()
    }

    assert_eq!(ids(&board.podium.rank1), vec!["red", "blue"]);
    assert_eq!(ids(&board.podium.rank2), vec!["green"]);
    assert!(board.podium.rank3.is_empty());
    assert!(board.podium.rest.is_empty());

    let standings: Vec<(String, u32, u32)> = board
        .standings
        .iter()
        .map(|entry| (entry.house.house_id.0.clone(), entry.rank, entry.house.score))
        .collect();
    assert_eq!(
        standings,
        vec![
            ("red".to_string(), 1, 10),
            ("blue".to_string(), 1, 10),
            ("green".to_string(), 3, 7)
        ]
    );
}

#[test]
fn storage_outage_is_internal() {
    let festival = festival_with(UnavailableStore, InMemoryNotifier::default(), limits(1, 1, 1));
    let error = festival.scoring.leaderboard().expect_err("store offline");
    assert!(matches!(error, ScoringError::Internal(_)));
}
