use chrono::{DateTime, Utc};
use quiz_core::model::{StarRating, UnitSetId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_progress_row, stars_to_i64, total_from_i64};
use crate::repository::{ProgressRecord, ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn merge_progress(
        &self,
        unit_set_id: UnitSetId,
        score: u32,
        stars: StarRating,
        at: DateTime<Utc>,
    ) -> Result<ProgressRecord, StorageError> {
        let set = id_i64("unit_set_id", unit_set_id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
                INSERT INTO unit_set_progress (
                    unit_set_id, best_score, best_stars, attempts, last_played_at
                )
                VALUES (?1, ?2, ?3, 1, ?4)
                ON CONFLICT (unit_set_id) DO UPDATE SET
                    best_score = MAX(best_score, excluded.best_score),
                    best_stars = MAX(best_stars, excluded.best_stars),
                    attempts = attempts + 1,
                    last_played_at = MAX(last_played_at, excluded.last_played_at)
            ",
        )
        .bind(set)
        .bind(i64::from(score))
        .bind(stars_to_i64(stars))
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let row = sqlx::query(
            r"
                SELECT unit_set_id, best_score, best_stars, attempts, last_played_at
                FROM unit_set_progress
                WHERE unit_set_id = ?1
            ",
        )
        .bind(set)
        .fetch_one(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        map_progress_row(&row)
    }

    async fn get_progress(
        &self,
        unit_set_id: UnitSetId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT unit_set_id, best_score, best_stars, attempts, last_played_at
                FROM unit_set_progress
                WHERE unit_set_id = ?1
            ",
        )
        .bind(id_i64("unit_set_id", unit_set_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn add_experience(&self, points: u64) -> Result<u64, StorageError> {
        let points = id_i64("experience", points)?;
        let total: i64 = sqlx::query_scalar(
            r"
                INSERT INTO experience (id, total) VALUES (1, ?1)
                ON CONFLICT (id) DO UPDATE SET total = total + excluded.total
                RETURNING total
            ",
        )
        .bind(points)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;
        total_from_i64(total)
    }

    async fn total_experience(&self) -> Result<u64, StorageError> {
        let total: Option<i64> = sqlx::query_scalar("SELECT total FROM experience WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        total.map_or(Ok(0), total_from_i64)
    }
}
