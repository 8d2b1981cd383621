use sqlx::Row;

use crate::repository::{AttemptRecord, SectionRecord, StorageError, TopicRecord};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range: {v}")))
}

pub(crate) fn u32_to_i64(v: u32) -> i64 {
    i64::from(v)
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow: {v}")))
}

/// JSON-encode a list column (bounded windows and concept sets are stored
/// as JSON text rather than join tables; they are small and read whole).
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(
    field: &'static str,
    raw: &str,
) -> Result<T, StorageError> {
    serde_json::from_str(raw)
        .map_err(|e| StorageError::Serialization(format!("{field}: {e}")))
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptRecord, StorageError> {
    Ok(AttemptRecord {
        question_id: row.try_get("question_id").map_err(ser)?,
        attempts: i64_to_u32("attempts", row.try_get("attempts").map_err(ser)?)?,
        correct: i64_to_u32("correct", row.try_get("correct").map_err(ser)?)?,
        last_attempt_at_ms: row.try_get("last_attempt_at_ms").map_err(ser)?,
        last_correct: row.try_get::<i64, _>("last_correct").map_err(ser)? != 0,
        ease_factor: row.try_get("ease_factor").map_err(ser)?,
        interval_days: i64_to_u32("interval_days", row.try_get("interval_days").map_err(ser)?)?,
        next_review_at_ms: row.try_get("next_review_at_ms").map_err(ser)?,
    })
}

/// Maps a section row; topic counters live in their own table and are
/// attached by the caller.
pub(crate) fn map_section_row(row: &sqlx::sqlite::SqliteRow) -> Result<SectionRecord, StorageError> {
    let recent_raw: String = row.try_get("recent_results").map_err(ser)?;
    let mastered_raw: String = row.try_get("mastered").map_err(ser)?;
    let struggling_raw: String = row.try_get("struggling").map_err(ser)?;

    Ok(SectionRecord {
        section_id: row.try_get("section_id").map_err(ser)?,
        attempts: i64_to_u32("attempts", row.try_get("attempts").map_err(ser)?)?,
        correct: i64_to_u32("correct", row.try_get("correct").map_err(ser)?)?,
        recent_results: from_json("recent_results", &recent_raw)?,
        mastered: from_json("mastered", &mastered_raw)?,
        struggling: from_json("struggling", &struggling_raw)?,
        topics: Vec::new(),
    })
}

pub(crate) fn map_topic_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<(String, TopicRecord), StorageError> {
    let section_id: String = row.try_get("section_id").map_err(ser)?;
    let record = TopicRecord {
        topic_id: row.try_get("topic_id").map_err(ser)?,
        attempts: i64_to_u32("attempts", row.try_get("attempts").map_err(ser)?)?,
        correct: i64_to_u32("correct", row.try_get("correct").map_err(ser)?)?,
    };
    Ok((section_id, record))
}
