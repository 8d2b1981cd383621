use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema: the singleton adaptive-state row, per-question
/// attempt history, per-section aggregates, per-topic counters, and indexes.
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

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS adaptive_state (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    difficulty TEXT NOT NULL,
                    recent_results TEXT NOT NULL,
                    recently_seen TEXT NOT NULL,
                    total_answered INTEGER NOT NULL CHECK (total_answered >= 0),
                    session_started_at_ms INTEGER
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS attempt_history (
                    question_id TEXT PRIMARY KEY,
                    attempts INTEGER NOT NULL CHECK (attempts >= 0),
                    correct INTEGER NOT NULL CHECK (correct >= 0 AND correct <= attempts),
                    last_attempt_at_ms INTEGER,
                    last_correct INTEGER NOT NULL CHECK (last_correct IN (0, 1)),
                    ease_factor REAL NOT NULL CHECK (ease_factor >= 1.3),
                    interval_days INTEGER NOT NULL CHECK (interval_days >= 0),
                    next_review_at_ms INTEGER
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS section_performance (
                    section_id TEXT PRIMARY KEY,
                    attempts INTEGER NOT NULL CHECK (attempts >= 0),
                    correct INTEGER NOT NULL CHECK (correct >= 0 AND correct <= attempts),
                    recent_results TEXT NOT NULL,
                    mastered TEXT NOT NULL,
                    struggling TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS topic_performance (
                    section_id TEXT NOT NULL,
                    topic_id TEXT NOT NULL,
                    attempts INTEGER NOT NULL CHECK (attempts >= 0),
                    correct INTEGER NOT NULL CHECK (correct >= 0 AND correct <= attempts),
                    PRIMARY KEY (section_id, topic_id),
                    FOREIGN KEY (section_id)
                        REFERENCES section_performance(section_id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attempt_history_next_review
                    ON attempt_history (next_review_at_ms, last_correct);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
