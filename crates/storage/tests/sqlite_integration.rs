use std::collections::BTreeSet;

use chrono::Duration;
use quiz_core::model::{AnswerRecord, AnswerResult, QuestionKind, SessionId, StarRating, UnitSetId};
use quiz_core::time::fixed_now;
use storage::repository::{
    AnswerLogEntry, AnswerLogRepository, AttemptRecord, AttemptRepository, ProgressRepository,
    StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn record(symbol: &str, result: AnswerResult, points: u32, time_taken: Option<u32>) -> AnswerRecord {
    AnswerRecord {
        symbol: symbol.to_owned(),
        label: format!("{symbol}-label"),
        kind: QuestionKind::Writing,
        expected: "x".to_owned(),
        result,
        points_earned: points,
        time_taken,
    }
}

#[tokio::test]
async fn sqlite_answer_log_round_trip_and_cleanup() {
    let repo = connect("memdb_answer_logs").await;
    let session_id = SessionId::new();
    let other = SessionId::new();

    for (sequence, session) in [(1, session_id), (2, session_id), (1, other)] {
        repo.append_answer(&AnswerLogEntry {
            session_id: session,
            unit_set_id: UnitSetId::new(3),
            sequence,
            record: record("ᛉ", AnswerResult::Wrong, 0, Some(30)),
            recorded_at: fixed_now() + Duration::seconds(i64::from(sequence)),
        })
        .await
        .expect("append");
    }

    let logs = repo.list_answers(session_id).await.expect("list");
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].sequence, 1);
    assert_eq!(logs[0].record.time_taken, Some(30));
    assert_eq!(logs[0].record.kind, QuestionKind::Writing);
    assert_eq!(logs[1].record.result, AnswerResult::Wrong);

    assert_eq!(repo.delete_session_answers(session_id).await.expect("delete"), 2);
    assert!(repo.list_answers(session_id).await.expect("list").is_empty());
    assert_eq!(repo.list_answers(other).await.expect("list").len(), 1);
}

#[tokio::test]
async fn sqlite_attempts_store_log_and_badges() {
    let repo = connect("memdb_attempts").await;
    let unit_set_id = UnitSetId::new(9);
    let session_id = SessionId::new();
    let mut badges = BTreeSet::new();
    badges.insert("Perfectionist".to_owned());

    let attempt = AttemptRecord {
        session_id,
        unit_set_id,
        attempt_number: 1,
        total_score: 25,
        max_possible_score: 25,
        stars: StarRating::Three,
        hearts_used: 0,
        badges,
        time_spent_secs: 61,
        game_over: false,
        answer_log: vec![
            record("ᛟ", AnswerResult::Correct, 10, None),
            record("ᛞ", AnswerResult::Correct, 15, None),
        ],
        started_at: fixed_now(),
        completed_at: fixed_now() + Duration::seconds(61),
    };

    let id = repo.insert_attempt(&attempt).await.expect("insert");
    let fetched = repo.get_attempt(id).await.expect("get");
    assert_eq!(fetched, attempt);

    let err = repo.insert_attempt(&attempt).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    assert_eq!(repo.count_attempts(unit_set_id).await.expect("count"), 1);
    let rows = repo.list_attempts(unit_set_id, 10).await.expect("list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, id);

    let missing = repo.get_attempt(id + 100).await.unwrap_err();
    assert!(matches!(missing, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_progress_is_monotonic_and_experience_adds_up() {
    let repo = connect("memdb_progress").await;
    let unit_set_id = UnitSetId::new(2);
    assert!(repo.get_progress(unit_set_id).await.expect("get").is_none());

    let first = repo
        .merge_progress(unit_set_id, 70, StarRating::Two, fixed_now())
        .await
        .expect("merge");
    assert_eq!(first.attempts, 1);

    let second = repo
        .merge_progress(
            unit_set_id,
            30,
            StarRating::One,
            fixed_now() + Duration::minutes(5),
        )
        .await
        .expect("merge");
    assert_eq!(second.best_score, 70);
    assert_eq!(second.best_stars, StarRating::Two);
    assert_eq!(second.attempts, 2);
    assert_eq!(second.last_played_at, fixed_now() + Duration::minutes(5));

    assert_eq!(repo.total_experience().await.expect("xp"), 0);
    repo.add_experience(70).await.expect("xp");
    assert_eq!(repo.add_experience(30).await.expect("xp"), 100);
    assert_eq!(repo.total_experience().await.expect("xp"), 100);
}
