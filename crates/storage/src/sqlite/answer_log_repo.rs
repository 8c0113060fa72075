use quiz_core::model::SessionId;

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_answer_row};
use crate::repository::{AnswerLogEntry, AnswerLogRepository, StorageError};

#[async_trait::async_trait]
impl AnswerLogRepository for SqliteRepository {
    async fn append_answer(&self, entry: &AnswerLogEntry) -> Result<i64, StorageError> {
        let record = &entry.record;
        let res = sqlx::query(
            r"
                INSERT INTO answer_logs (
                    session_id, unit_set_id, sequence, symbol, label, kind,
                    expected, result, points_earned, time_taken, recorded_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(entry.session_id.to_string())
        .bind(id_i64("unit_set_id", entry.unit_set_id.value())?)
        .bind(i64::from(entry.sequence))
        .bind(&record.symbol)
        .bind(&record.label)
        .bind(record.kind.as_str())
        .bind(&record.expected)
        .bind(record.result.as_str())
        .bind(i64::from(record.points_earned))
        .bind(record.time_taken.map(i64::from))
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn list_answers(&self, session_id: SessionId) -> Result<Vec<AnswerLogEntry>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    session_id, unit_set_id, sequence, symbol, label, kind,
                    expected, result, points_earned, time_taken, recorded_at
                FROM answer_logs
                WHERE session_id = ?1
                ORDER BY sequence ASC, id ASC
            ",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_answer_row(&row)?);
        }
        Ok(out)
    }

    async fn delete_session_answers(&self, session_id: SessionId) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM answer_logs WHERE session_id = ?1")
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }
}
