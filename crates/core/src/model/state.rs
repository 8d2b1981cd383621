use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::difficulty::DifficultyAdapter;
use crate::model::{
    AttemptHistory, Difficulty, QuestionId, SectionId, SectionPerformance, TopicId,
};
use crate::scheduler::{ReviewSchedule, Scheduler};

/// Size of the global recent-results window driving difficulty adjustment.
pub const RECENT_RESULTS_WINDOW: usize = 10;

/// Size of the recently-seen question window used by the selector.
pub const RECENTLY_SEEN_WINDOW: usize = 50;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised by `AdaptiveState` operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StateError {
    #[error("unknown section: {section}")]
    UnknownSection { section: SectionId },
}

//
// ─── ANSWER EVENT / OUTCOME ────────────────────────────────────────────────────
//

/// One answer from the learner, as reported by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerEvent {
    pub question_id: QuestionId,
    pub section: SectionId,
    pub topic: Option<TopicId>,
    pub is_correct: bool,
    pub concepts: Vec<String>,
}

impl AnswerEvent {
    #[must_use]
    pub fn new(question_id: QuestionId, section: SectionId, is_correct: bool) -> Self {
        Self {
            question_id,
            section,
            topic: None,
            is_correct,
            concepts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_topic(mut self, topic: TopicId) -> Self {
        self.topic = Some(topic);
        self
    }

    #[must_use]
    pub fn with_concepts(mut self, concepts: Vec<String>) -> Self {
        self.concepts = concepts;
        self
    }
}

/// What recording an answer decided: the question's next schedule and the
/// (possibly unchanged) difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerOutcome {
    pub schedule: ReviewSchedule,
    pub difficulty: Difficulty,
    pub difficulty_changed: bool,
}

//
// ─── ADAPTIVE STATE ────────────────────────────────────────────────────────────
//

/// Root aggregate for one learner's adaptive practice state.
///
/// Owns every nested map exclusively; all mutation flows through
/// [`AdaptiveState::record_answer`] so the invariants of the attempt
/// histories and section aggregates stay consistent. There is no ambient
/// instance — callers construct one (fresh or from storage) and pass it
/// into the services that need it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveState {
    difficulty: Difficulty,
    recent_results: VecDeque<bool>,
    sections: BTreeMap<SectionId, SectionPerformance>,
    attempts: BTreeMap<QuestionId, AttemptHistory>,
    recently_seen: VecDeque<QuestionId>,
    total_answered: u64,
    session_started_at: Option<DateTime<Utc>>,
}

impl AdaptiveState {
    /// Fresh state for a known set of sections, starting at `Medium` so the
    /// adapter can move in either direction.
    #[must_use]
    pub fn new(sections: impl IntoIterator<Item = SectionId>) -> Self {
        Self {
            difficulty: Difficulty::Medium,
            recent_results: VecDeque::new(),
            sections: sections
                .into_iter()
                .map(|s| (s, SectionPerformance::new()))
                .collect(),
            attempts: BTreeMap::new(),
            recently_seen: VecDeque::new(),
            total_answered: 0,
            session_started_at: None,
        }
    }

    /// Rehydrate a state from storage-shaped parts.
    ///
    /// Windows are truncated to their caps (keeping the newest entries) so
    /// an oversized stored form cannot break the bounded-window invariants.
    #[must_use]
    pub fn from_persisted(
        difficulty: Difficulty,
        recent_results: Vec<bool>,
        sections: BTreeMap<SectionId, SectionPerformance>,
        attempts: BTreeMap<QuestionId, AttemptHistory>,
        recently_seen: Vec<QuestionId>,
        total_answered: u64,
        session_started_at: Option<DateTime<Utc>>,
    ) -> Self {
        let mut recent: VecDeque<bool> = recent_results.into();
        while recent.len() > RECENT_RESULTS_WINDOW {
            recent.pop_front();
        }
        let mut seen: VecDeque<QuestionId> = recently_seen.into();
        while seen.len() > RECENTLY_SEEN_WINDOW {
            seen.pop_front();
        }

        Self {
            difficulty,
            recent_results: recent,
            sections,
            attempts,
            recently_seen: seen,
            total_answered,
            session_started_at,
        }
    }

    /// The single mutation entry point: fold one answer into the state.
    ///
    /// Performs, in order: recent-window append, attempt-history update,
    /// scheduler delegation, section/topic/concept aggregation, difficulty
    /// recalculation, seen-window append, and the total counter. Safe to
    /// call once per real answer event; calling it twice for the same event
    /// double-counts.
    ///
    /// # Errors
    ///
    /// Returns `StateError::UnknownSection` — before any mutation — if the
    /// event names a section this state was not initialized with.
    pub fn record_answer(
        &mut self,
        event: &AnswerEvent,
        scheduler: &Scheduler,
        adapter: &DifficultyAdapter,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, StateError> {
        if !self.sections.contains_key(&event.section) {
            return Err(StateError::UnknownSection {
                section: event.section.clone(),
            });
        }

        self.recent_results.push_back(event.is_correct);
        while self.recent_results.len() > RECENT_RESULTS_WINDOW {
            self.recent_results.pop_front();
        }

        let history = self
            .attempts
            .entry(event.question_id.clone())
            .or_insert_with(AttemptHistory::new);
        history.record_result(event.is_correct, now);

        let schedule = scheduler.next_schedule(history, event.is_correct, now);
        history.apply_schedule(
            schedule.interval_days,
            schedule.ease_factor,
            schedule.next_review_at,
        );

        let section = self
            .sections
            .get_mut(&event.section)
            .expect("section presence checked above");
        section.record(event.is_correct, event.topic.as_ref(), &event.concepts);

        let results: Vec<bool> = self.recent_results.iter().copied().collect();
        let next_difficulty = adapter.adjust(self.difficulty, &results);
        let difficulty_changed = next_difficulty != self.difficulty;
        self.difficulty = next_difficulty;

        self.recently_seen.push_back(event.question_id.clone());
        while self.recently_seen.len() > RECENTLY_SEEN_WINDOW {
            self.recently_seen.pop_front();
        }

        self.total_answered = self.total_answered.saturating_add(1);

        Ok(AnswerOutcome {
            schedule,
            difficulty: self.difficulty,
            difficulty_changed,
        })
    }

    /// Question ids due for scheduled review, most overdue first.
    #[must_use]
    pub fn due_for_review(&self, scheduler: &Scheduler, now: DateTime<Utc>) -> Vec<QuestionId> {
        let mut due: Vec<(&QuestionId, DateTime<Utc>)> = self
            .attempts
            .iter()
            .filter(|(_, h)| scheduler.is_due(h, now))
            .filter_map(|(id, h)| h.next_review_at().map(|at| (id, at)))
            .collect();
        due.sort_by_key(|(id, at)| (*at, (*id).clone()));
        due.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Make sure every given section has an entry, creating empty
    /// aggregates for new ones. Lets a persisted state pick up sections the
    /// content bank gained since it was saved; existing entries are kept.
    pub fn ensure_sections(&mut self, sections: impl IntoIterator<Item = SectionId>) {
        for section in sections {
            self.sections.entry(section).or_default();
        }
    }

    /// Drop all progress, keeping the known section set. Used only for
    /// explicit user-initiated resets.
    pub fn reset(&mut self) {
        let sections: Vec<SectionId> = self.sections.keys().cloned().collect();
        *self = Self::new(sections);
    }

    // ─── Session stamp ─────────────────────────────────────────────────────

    pub fn start_session(&mut self, now: DateTime<Utc>) {
        self.session_started_at = Some(now);
    }

    /// Clears and returns the session-start stamp.
    pub fn take_session_start(&mut self) -> Option<DateTime<Utc>> {
        self.session_started_at.take()
    }

    // ─── Accessors ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn recent_results(&self) -> &VecDeque<bool> {
        &self.recent_results
    }

    /// Fraction correct within the global recent-results window.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn recent_accuracy(&self) -> f64 {
        if self.recent_results.is_empty() {
            0.0
        } else {
            let correct = self.recent_results.iter().filter(|r| **r).count();
            correct as f64 / self.recent_results.len() as f64
        }
    }

    /// Lifetime accuracy across every attempt history.
    #[must_use]
    pub fn overall_accuracy(&self) -> f64 {
        let (attempts, correct) = self.attempts.values().fold((0_u64, 0_u64), |(a, c), h| {
            (a + u64::from(h.attempts()), c + u64::from(h.correct()))
        });
        if attempts == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                correct as f64 / attempts as f64
            }
        }
    }

    #[must_use]
    pub fn sections(&self) -> &BTreeMap<SectionId, SectionPerformance> {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, id: &SectionId) -> Option<&SectionPerformance> {
        self.sections.get(id)
    }

    #[must_use]
    pub fn attempts(&self) -> &BTreeMap<QuestionId, AttemptHistory> {
        &self.attempts
    }

    #[must_use]
    pub fn attempt(&self, id: &QuestionId) -> Option<&AttemptHistory> {
        self.attempts.get(id)
    }

    #[must_use]
    pub fn recently_seen(&self) -> &VecDeque<QuestionId> {
        &self.recently_seen
    }

    #[must_use]
    pub fn has_recently_seen(&self, id: &QuestionId) -> bool {
        self.recently_seen.contains(id)
    }

    #[must_use]
    pub fn total_answered(&self) -> u64 {
        self.total_answered
    }

    #[must_use]
    pub fn session_started_at(&self) -> Option<DateTime<Utc>> {
        self.session_started_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
