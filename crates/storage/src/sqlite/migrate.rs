use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::SqliteInitError;

/// Runs the versioned migrations for the session schema.
///
/// Version 1 creates answer logs, attempts, per-unit-set progress and the
/// experience counter.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if is_applied(pool, 1).await? {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS answer_logs (
                id INTEGER PRIMARY KEY,
                session_id TEXT NOT NULL,
                unit_set_id INTEGER NOT NULL,
                sequence INTEGER NOT NULL CHECK (sequence >= 1),
                symbol TEXT NOT NULL,
                label TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('mcq', 'writing', 'drag')),
                expected TEXT NOT NULL,
                result TEXT NOT NULL CHECK (result IN ('CORRECT', 'WRONG')),
                points_earned INTEGER NOT NULL CHECK (points_earned >= 0),
                time_taken INTEGER CHECK (time_taken IS NULL OR time_taken >= 0),
                recorded_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_answer_logs_session
            ON answer_logs (session_id, sequence);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY,
                session_id TEXT NOT NULL UNIQUE,
                unit_set_id INTEGER NOT NULL,
                attempt_number INTEGER NOT NULL CHECK (attempt_number >= 1),
                total_score INTEGER NOT NULL CHECK (total_score >= 0),
                max_possible_score INTEGER NOT NULL CHECK (max_possible_score >= 0),
                stars INTEGER NOT NULL CHECK (stars BETWEEN 0 AND 3),
                hearts_used INTEGER NOT NULL CHECK (hearts_used >= 0),
                badges TEXT NOT NULL,
                time_spent_secs INTEGER NOT NULL CHECK (time_spent_secs >= 0),
                game_over INTEGER NOT NULL CHECK (game_over IN (0, 1)),
                answer_log TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_attempts_unit_set
            ON attempts (unit_set_id, completed_at);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS unit_set_progress (
                unit_set_id INTEGER PRIMARY KEY,
                best_score INTEGER NOT NULL CHECK (best_score >= 0),
                best_stars INTEGER NOT NULL CHECK (best_stars BETWEEN 0 AND 3),
                attempts INTEGER NOT NULL CHECK (attempts >= 0),
                last_played_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS experience (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                total INTEGER NOT NULL CHECK (total >= 0)
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    debug!(version = 1, "applied sqlite migration");
    Ok(())
}
