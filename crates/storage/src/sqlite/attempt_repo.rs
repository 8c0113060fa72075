use quiz_core::model::UnitSetId;

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_attempt_row, ser, stars_to_i64};
use crate::repository::{AttemptRecord, AttemptRepository, AttemptRow, StorageError};

const ATTEMPT_COLUMNS: &str = r"
    id, session_id, unit_set_id, attempt_number, total_score, max_possible_score,
    stars, hearts_used, badges, time_spent_secs, game_over, answer_log,
    started_at, completed_at
";

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn insert_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let badges = serde_json::to_string(&attempt.badges).map_err(ser)?;
        let answer_log = serde_json::to_string(&attempt.answer_log).map_err(ser)?;
        let time_spent = i64::try_from(attempt.time_spent_secs)
            .map_err(|_| StorageError::Serialization("time_spent_secs overflow".into()))?;

        let res = sqlx::query(
            r"
                INSERT INTO attempts (
                    session_id, unit_set_id, attempt_number, total_score,
                    max_possible_score, stars, hearts_used, badges,
                    time_spent_secs, game_over, answer_log, started_at, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ",
        )
        .bind(attempt.session_id.to_string())
        .bind(id_i64("unit_set_id", attempt.unit_set_id.value())?)
        .bind(i64::from(attempt.attempt_number))
        .bind(i64::from(attempt.total_score))
        .bind(i64::from(attempt.max_possible_score))
        .bind(stars_to_i64(attempt.stars))
        .bind(i64::from(attempt.hearts_used))
        .bind(badges)
        .bind(time_spent)
        .bind(i64::from(attempt.game_over))
        .bind(answer_log)
        .bind(attempt.started_at)
        .bind(attempt.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            other => conn(other),
        })?;

        Ok(res.last_insert_rowid())
    }

    async fn get_attempt(&self, id: i64) -> Result<AttemptRecord, StorageError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        Ok(map_attempt_row(&row)?.attempt)
    }

    async fn count_attempts(&self, unit_set_id: UnitSetId) -> Result<u32, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE unit_set_id = ?1")
            .bind(id_i64("unit_set_id", unit_set_id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        u32::try_from(count).map_err(|_| StorageError::Serialization("attempt count overflow".into()))
    }

    async fn list_attempts(
        &self,
        unit_set_id: UnitSetId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE unit_set_id = ?1 \
             ORDER BY completed_at DESC, id DESC LIMIT ?2"
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("unit_set_id", unit_set_id.value())?)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }
        Ok(out)
    }
}
