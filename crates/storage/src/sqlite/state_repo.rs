use async_trait::async_trait;
use sqlx::Row;
use std::collections::BTreeMap;

use super::SqliteRepository;
use super::mapping::{
    conn, from_json, map_attempt_row, map_section_row, map_topic_row, ser, to_json, u32_to_i64,
    u64_to_i64,
};
use crate::repository::{StateRepository, StateSnapshot, StorageError, TopicRecord};

#[async_trait]
impl StateRepository for SqliteRepository {
    async fn load(&self) -> Result<Option<StateSnapshot>, StorageError> {
        let Some(state_row) = sqlx::query(
            "SELECT difficulty, recent_results, recently_seen, total_answered,
                    session_started_at_ms
             FROM adaptive_state WHERE id = 1",
        )
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?
        else {
            return Ok(None);
        };

        let recent_raw: String = state_row.try_get("recent_results").map_err(ser)?;
        let seen_raw: String = state_row.try_get("recently_seen").map_err(ser)?;
        let total_answered: i64 = state_row.try_get("total_answered").map_err(ser)?;
        let total_answered = u64::try_from(total_answered).map_err(|_| {
            StorageError::Serialization(format!("negative total_answered: {total_answered}"))
        })?;

        let attempt_rows = sqlx::query(
            "SELECT question_id, attempts, correct, last_attempt_at_ms, last_correct,
                    ease_factor, interval_days, next_review_at_ms
             FROM attempt_history ORDER BY question_id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;
        let attempts = attempt_rows
            .iter()
            .map(map_attempt_row)
            .collect::<Result<Vec<_>, _>>()?;

        let section_rows = sqlx::query(
            "SELECT section_id, attempts, correct, recent_results, mastered, struggling
             FROM section_performance ORDER BY section_id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;
        let mut sections = section_rows
            .iter()
            .map(map_section_row)
            .collect::<Result<Vec<_>, _>>()?;

        let topic_rows = sqlx::query(
            "SELECT section_id, topic_id, attempts, correct
             FROM topic_performance ORDER BY section_id, topic_id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;
        let mut topics_by_section: BTreeMap<String, Vec<TopicRecord>> = BTreeMap::new();
        for row in &topic_rows {
            let (section_id, record) = map_topic_row(row)?;
            topics_by_section.entry(section_id).or_default().push(record);
        }
        for section in &mut sections {
            if let Some(topics) = topics_by_section.remove(&section.section_id) {
                section.topics = topics;
            }
        }

        Ok(Some(StateSnapshot {
            difficulty: state_row.try_get("difficulty").map_err(ser)?,
            recent_results: from_json("recent_results", &recent_raw)?,
            recently_seen: from_json("recently_seen", &seen_raw)?,
            total_answered,
            session_started_at_ms: state_row.try_get("session_started_at_ms").map_err(ser)?,
            attempts,
            sections,
        }))
    }

    async fn save(&self, snapshot: &StateSnapshot) -> Result<(), StorageError> {
        // Whole-state replacement in one transaction: this is a
        // single-writer local store, so last write wins by design.
        let mut tx = self.pool().begin().await.map_err(conn)?;

        for table in [
            "topic_performance",
            "section_performance",
            "attempt_history",
            "adaptive_state",
        ] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }

        sqlx::query(
            "INSERT INTO adaptive_state
                 (id, difficulty, recent_results, recently_seen, total_answered,
                  session_started_at_ms)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&snapshot.difficulty)
        .bind(to_json(&snapshot.recent_results)?)
        .bind(to_json(&snapshot.recently_seen)?)
        .bind(u64_to_i64("total_answered", snapshot.total_answered)?)
        .bind(snapshot.session_started_at_ms)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        for attempt in &snapshot.attempts {
            sqlx::query(
                "INSERT INTO attempt_history
                     (question_id, attempts, correct, last_attempt_at_ms, last_correct,
                      ease_factor, interval_days, next_review_at_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(&attempt.question_id)
            .bind(u32_to_i64(attempt.attempts))
            .bind(u32_to_i64(attempt.correct))
            .bind(attempt.last_attempt_at_ms)
            .bind(i64::from(attempt.last_correct))
            .bind(attempt.ease_factor)
            .bind(u32_to_i64(attempt.interval_days))
            .bind(attempt.next_review_at_ms)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        for section in &snapshot.sections {
            sqlx::query(
                "INSERT INTO section_performance
                     (section_id, attempts, correct, recent_results, mastered, struggling)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&section.section_id)
            .bind(u32_to_i64(section.attempts))
            .bind(u32_to_i64(section.correct))
            .bind(to_json(&section.recent_results)?)
            .bind(to_json(&section.mastered)?)
            .bind(to_json(&section.struggling)?)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            for topic in &section.topics {
                sqlx::query(
                    "INSERT INTO topic_performance (section_id, topic_id, attempts, correct)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .bind(&section.section_id)
                .bind(&topic.topic_id)
                .bind(u32_to_i64(topic.attempts))
                .bind(u32_to_i64(topic.correct))
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
        }

        tx.commit().await.map_err(conn)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut tx = self.pool().begin().await.map_err(conn)?;
        for table in [
            "topic_performance",
            "section_performance",
            "attempt_history",
            "adaptive_state",
        ] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }
        tx.commit().await.map_err(conn)
    }
}
