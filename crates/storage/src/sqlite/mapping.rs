use chrono::{DateTime, Utc};
use quiz_core::model::{AnswerRecord, AnswerResult, QuestionKind, SessionId, StarRating, UnitSetId};
use sqlx::Row;

use crate::repository::{AnswerLogEntry, AttemptRecord, AttemptRow, ProgressRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn unit_set_id_from_i64(v: i64) -> Result<UnitSetId, StorageError> {
    Ok(UnitSetId::new(u64_from_i64("unit_set_id", v)?))
}

pub(crate) fn session_id_from_str(raw: &str) -> Result<SessionId, StorageError> {
    raw.parse().map_err(ser)
}

pub(crate) fn stars_to_i64(stars: StarRating) -> i64 {
    i64::from(stars.stars())
}

pub(crate) fn stars_from_i64(v: i64) -> Result<StarRating, StorageError> {
    u8::try_from(v)
        .ok()
        .and_then(StarRating::from_stars)
        .ok_or_else(|| StorageError::Serialization(format!("invalid stars: {v}")))
}

fn parse_result(raw: &str) -> Result<AnswerResult, StorageError> {
    AnswerResult::parse(raw)
        .ok_or_else(|| StorageError::Serialization(format!("invalid result: {raw}")))
}

fn parse_kind(raw: &str) -> Result<QuestionKind, StorageError> {
    raw.parse().map_err(ser)
}

pub(crate) fn map_answer_row(row: &sqlx::sqlite::SqliteRow) -> Result<AnswerLogEntry, StorageError> {
    let session_id = session_id_from_str(&row.try_get::<String, _>("session_id").map_err(ser)?)?;
    let unit_set_id = unit_set_id_from_i64(row.try_get::<i64, _>("unit_set_id").map_err(ser)?)?;
    let sequence = u32_from_i64("sequence", row.try_get::<i64, _>("sequence").map_err(ser)?)?;
    let time_taken = row
        .try_get::<Option<i64>, _>("time_taken")
        .map_err(ser)?
        .map(|v| u32_from_i64("time_taken", v))
        .transpose()?;
    let recorded_at: DateTime<Utc> = row.try_get("recorded_at").map_err(ser)?;

    let record = AnswerRecord {
        symbol: row.try_get("symbol").map_err(ser)?,
        label: row.try_get("label").map_err(ser)?,
        kind: parse_kind(&row.try_get::<String, _>("kind").map_err(ser)?)?,
        expected: row.try_get("expected").map_err(ser)?,
        result: parse_result(&row.try_get::<String, _>("result").map_err(ser)?)?,
        points_earned: u32_from_i64(
            "points_earned",
            row.try_get::<i64, _>("points_earned").map_err(ser)?,
        )?,
        time_taken,
    };

    Ok(AnswerLogEntry {
        session_id,
        unit_set_id,
        sequence,
        record,
        recorded_at,
    })
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let badges: String = row.try_get("badges").map_err(ser)?;
    let answer_log: String = row.try_get("answer_log").map_err(ser)?;

    let attempt = AttemptRecord {
        session_id: session_id_from_str(&row.try_get::<String, _>("session_id").map_err(ser)?)?,
        unit_set_id: unit_set_id_from_i64(row.try_get::<i64, _>("unit_set_id").map_err(ser)?)?,
        attempt_number: u32_from_i64(
            "attempt_number",
            row.try_get::<i64, _>("attempt_number").map_err(ser)?,
        )?,
        total_score: u32_from_i64("total_score", row.try_get::<i64, _>("total_score").map_err(ser)?)?,
        max_possible_score: u32_from_i64(
            "max_possible_score",
            row.try_get::<i64, _>("max_possible_score").map_err(ser)?,
        )?,
        stars: stars_from_i64(row.try_get::<i64, _>("stars").map_err(ser)?)?,
        hearts_used: u32_from_i64("hearts_used", row.try_get::<i64, _>("hearts_used").map_err(ser)?)?,
        badges: serde_json::from_str(&badges).map_err(ser)?,
        time_spent_secs: u64_from_i64(
            "time_spent_secs",
            row.try_get::<i64, _>("time_spent_secs").map_err(ser)?,
        )?,
        game_over: row.try_get::<i64, _>("game_over").map_err(ser)? != 0,
        answer_log: serde_json::from_str(&answer_log).map_err(ser)?,
        started_at: row.try_get("started_at").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    };

    Ok(AttemptRow { id, attempt })
}

pub(crate) fn map_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProgressRecord, StorageError> {
    Ok(ProgressRecord {
        unit_set_id: unit_set_id_from_i64(row.try_get::<i64, _>("unit_set_id").map_err(ser)?)?,
        best_score: u32_from_i64("best_score", row.try_get::<i64, _>("best_score").map_err(ser)?)?,
        best_stars: stars_from_i64(row.try_get::<i64, _>("best_stars").map_err(ser)?)?,
        attempts: u32_from_i64("attempts", row.try_get::<i64, _>("attempts").map_err(ser)?)?,
        last_played_at: row.try_get("last_played_at").map_err(ser)?,
    })
}

pub(crate) fn total_from_i64(v: i64) -> Result<u64, StorageError> {
    u64_from_i64("experience", v)
}
