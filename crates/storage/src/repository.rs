use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prep_core::model::{
    AdaptiveState, AttemptHistory, Difficulty, QuestionId, SectionId, SectionPerformance, TopicId,
    TopicStats,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

fn ms_to_datetime(field: &'static str, ms: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| StorageError::Serialization(format!("{field}: invalid epoch millis {ms}")))
}

//
// ─── ATTEMPT RECORD ────────────────────────────────────────────────────────────
//

/// Storage-shaped form of one question's `AttemptHistory`.
///
/// Timestamps are epoch milliseconds at this boundary; the rich time type
/// exists only in memory. This mirror keeps the storage format decoupled
/// from the domain representation.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub question_id: String,
    pub attempts: u32,
    pub correct: u32,
    pub last_attempt_at_ms: Option<i64>,
    pub last_correct: bool,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub next_review_at_ms: Option<i64>,
}

impl AttemptRecord {
    #[must_use]
    pub fn from_history(id: &QuestionId, history: &AttemptHistory) -> Self {
        Self {
            question_id: id.as_str().to_owned(),
            attempts: history.attempts(),
            correct: history.correct(),
            last_attempt_at_ms: history.last_attempt_at().map(|t| t.timestamp_millis()),
            last_correct: history.last_correct(),
            ease_factor: history.ease_factor(),
            interval_days: history.interval_days(),
            next_review_at_ms: history.next_review_at().map(|t| t.timestamp_millis()),
        }
    }

    /// Convert the record back into domain types.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for unrepresentable timestamps
    /// or invariant-violating counters.
    pub fn into_history(self) -> Result<(QuestionId, AttemptHistory), StorageError> {
        let last_attempt_at = self
            .last_attempt_at_ms
            .map(|ms| ms_to_datetime("last_attempt_at", ms))
            .transpose()?;
        let next_review_at = self
            .next_review_at_ms
            .map(|ms| ms_to_datetime("next_review_at", ms))
            .transpose()?;

        let history = AttemptHistory::from_persisted(
            self.attempts,
            self.correct,
            last_attempt_at,
            self.last_correct,
            self.ease_factor,
            self.interval_days,
            next_review_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

        Ok((QuestionId::new(self.question_id), history))
    }
}

//
// ─── SECTION / TOPIC RECORDS ───────────────────────────────────────────────────
//

/// Storage-shaped per-topic counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRecord {
    pub topic_id: String,
    pub attempts: u32,
    pub correct: u32,
}

/// Storage-shaped form of a `SectionPerformance`, with map-typed fields
/// flattened into lists.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord {
    pub section_id: String,
    pub attempts: u32,
    pub correct: u32,
    pub recent_results: Vec<bool>,
    pub mastered: Vec<String>,
    pub struggling: Vec<String>,
    pub topics: Vec<TopicRecord>,
}

impl SectionRecord {
    #[must_use]
    pub fn from_performance(id: &SectionId, perf: &SectionPerformance) -> Self {
        Self {
            section_id: id.as_str().to_owned(),
            attempts: perf.attempts(),
            correct: perf.correct(),
            recent_results: perf.recent_results().iter().copied().collect(),
            mastered: perf.mastered().iter().cloned().collect(),
            struggling: perf.struggling().iter().cloned().collect(),
            topics: perf
                .topics()
                .iter()
                .map(|(topic, stats)| TopicRecord {
                    topic_id: topic.as_str().to_owned(),
                    attempts: stats.attempts(),
                    correct: stats.correct(),
                })
                .collect(),
        }
    }

    /// Convert the record back into domain types.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored counters violate
    /// section invariants.
    pub fn into_performance(self) -> Result<(SectionId, SectionPerformance), StorageError> {
        let topics: BTreeMap<TopicId, TopicStats> = self
            .topics
            .into_iter()
            .map(|t| {
                (
                    TopicId::new(t.topic_id),
                    TopicStats::new(t.attempts, t.correct),
                )
            })
            .collect();

        let perf = SectionPerformance::from_persisted(
            self.attempts,
            self.correct,
            self.recent_results,
            self.mastered.into_iter().collect::<BTreeSet<String>>(),
            self.struggling.into_iter().collect::<BTreeSet<String>>(),
            topics,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

        Ok((SectionId::new(self.section_id), perf))
    }
}

//
// ─── STATE SNAPSHOT ────────────────────────────────────────────────────────────
//

/// Full storage-shaped snapshot of an `AdaptiveState`.
///
/// This is the explicit serialize/deserialize boundary: repositories only
/// ever see snapshots, so storage format changes stay isolated from the
/// in-memory representation.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub difficulty: String,
    pub recent_results: Vec<bool>,
    pub recently_seen: Vec<String>,
    pub total_answered: u64,
    pub session_started_at_ms: Option<i64>,
    pub attempts: Vec<AttemptRecord>,
    pub sections: Vec<SectionRecord>,
}

impl StateSnapshot {
    #[must_use]
    pub fn from_state(state: &AdaptiveState) -> Self {
        Self {
            difficulty: state.difficulty().as_str().to_owned(),
            recent_results: state.recent_results().iter().copied().collect(),
            recently_seen: state
                .recently_seen()
                .iter()
                .map(|q| q.as_str().to_owned())
                .collect(),
            total_answered: state.total_answered(),
            session_started_at_ms: state.session_started_at().map(|t| t.timestamp_millis()),
            attempts: state
                .attempts()
                .iter()
                .map(|(id, h)| AttemptRecord::from_history(id, h))
                .collect(),
            sections: state
                .sections()
                .iter()
                .map(|(id, perf)| SectionRecord::from_performance(id, perf))
                .collect(),
        }
    }

    /// Reconstitute the in-memory state, validating every nested invariant.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for unknown difficulty strings,
    /// unrepresentable timestamps, or inconsistent counters.
    pub fn into_state(self) -> Result<AdaptiveState, StorageError> {
        let difficulty = Difficulty::parse(&self.difficulty).ok_or_else(|| {
            StorageError::Serialization(format!("unknown difficulty: {}", self.difficulty))
        })?;

        let session_started_at = self
            .session_started_at_ms
            .map(|ms| ms_to_datetime("session_started_at", ms))
            .transpose()?;

        let attempts = self
            .attempts
            .into_iter()
            .map(AttemptRecord::into_history)
            .collect::<Result<BTreeMap<QuestionId, AttemptHistory>, StorageError>>()?;

        let sections = self
            .sections
            .into_iter()
            .map(SectionRecord::into_performance)
            .collect::<Result<BTreeMap<SectionId, SectionPerformance>, StorageError>>()?;

        Ok(AdaptiveState::from_persisted(
            difficulty,
            self.recent_results,
            sections,
            attempts,
            self.recently_seen.into_iter().map(QuestionId::new).collect(),
            self.total_answered,
            session_started_at,
        ))
    }
}

//
// ─── REPOSITORY CONTRACT ───────────────────────────────────────────────────────
//

/// Persistence contract for the learner's adaptive state.
///
/// A single-learner, single-writer local store: `load` yields the last
/// saved snapshot (or `None` on first run), `save` replaces it wholesale,
/// `clear` backs the explicit user reset.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Fetch the persisted snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store is unreadable or the stored form
    /// cannot be decoded. Callers are expected to treat decode failures as
    /// recoverable (discard and reinitialize).
    async fn load(&self) -> Result<Option<StateSnapshot>, StorageError>;

    /// Replace the persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save(&self, snapshot: &StateSnapshot) -> Result<(), StorageError>;

    /// Remove any persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be cleared.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStateRepository {
    slot: Arc<Mutex<Option<StateSnapshot>>>,
}

impl InMemoryStateRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateRepository for InMemoryStateRepository {
    async fn load(&self) -> Result<Option<StateSnapshot>, StorageError> {
        let guard = self
            .slot
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save(&self, snapshot: &StateSnapshot) -> Result<(), StorageError> {
        let mut guard = self
            .slot
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(snapshot.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self
            .slot
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Aggregates the state repository behind a trait object so backends can be
/// swapped without touching callers.
#[derive(Clone)]
pub struct Storage {
    pub state: Arc<dyn StateRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(InMemoryStateRepository::new()),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use prep_core::difficulty::DifficultyAdapter;
    use prep_core::model::AnswerEvent;
    use prep_core::scheduler::Scheduler;
    use prep_core::time::fixed_now;

    fn populated_state() -> AdaptiveState {
        let mut state = AdaptiveState::new([SectionId::new("networking"), SectionId::new("ops")]);
        let scheduler = Scheduler::new();
        let adapter = DifficultyAdapter::new();

        let events = [
            ("q1", "networking", true, Some("subnetting")),
            ("q2", "networking", false, Some("subnetting")),
            ("q3", "ops", true, None),
            ("q1", "networking", false, Some("subnetting")),
        ];
        for (id, section, ok, topic) in events {
            let mut event =
                AnswerEvent::new(QuestionId::new(id), SectionId::new(section), ok)
                    .with_concepts(vec!["cidr".to_string()]);
            if let Some(topic) = topic {
                event = event.with_topic(TopicId::new(topic));
            }
            state
                .record_answer(&event, &scheduler, &adapter, fixed_now())
                .unwrap();
        }
        state.start_session(fixed_now());
        state
    }

    #[test]
    fn snapshot_round_trips_state() {
        let state = populated_state();
        let snapshot = StateSnapshot::from_state(&state);
        let restored = snapshot.into_state().unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn snapshot_rejects_unknown_difficulty() {
        let mut snapshot = StateSnapshot::from_state(&populated_state());
        snapshot.difficulty = "nightmare".to_string();
        let err = snapshot.into_state().unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn snapshot_rejects_invalid_counters() {
        let mut snapshot = StateSnapshot::from_state(&populated_state());
        snapshot.attempts[0].correct = snapshot.attempts[0].attempts + 1;
        let err = snapshot.into_state().unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn in_memory_repository_round_trips() {
        let repo = InMemoryStateRepository::new();
        assert!(repo.load().await.unwrap().is_none());

        let snapshot = StateSnapshot::from_state(&populated_state());
        repo.save(&snapshot).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), Some(snapshot));

        repo.clear().await.unwrap();
        assert!(repo.load().await.unwrap().is_none());
    }

    #[test]
    fn storage_aggregate_is_cloneable() {
        let storage = Storage::in_memory();
        let clone = storage.clone();
        assert!(Arc::ptr_eq(&storage.state, &clone.state));
    }
}
