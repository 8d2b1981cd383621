use chrono::{DateTime, Utc};

use prep_core::model::{AdaptiveState, AnswerEvent, AnswerOutcome, QuestionRecord, SectionId};
use prep_core::time::Clock;
use storage::repository::Storage;

use crate::error::EngineError;
use crate::mastery_service::{self, MasteryService};
use crate::selector::{QuestionSelector, SelectedQuestion, SelectionCriteria, TopicWeights};
use crate::session_service::{SessionReport, SessionService};
use crate::summary::{PerformanceSummary, performance_summary};

/// One-stop facade over the practice services, owning the state handle.
///
/// The engine wires the mastery service, selector, and session service to a
/// shared [`Storage`] and a single [`AdaptiveState`]. UIs call the engine;
/// the services underneath stay independently testable.
pub struct PracticeEngine {
    storage: Storage,
    mastery: MasteryService,
    sessions: SessionService,
    selector: QuestionSelector,
    clock: Clock,
    state: AdaptiveState,
}

impl PracticeEngine {
    /// Build an engine over the given storage, loading persisted state or
    /// starting fresh for the given sections.
    pub async fn load(
        storage: Storage,
        sections: impl IntoIterator<Item = SectionId>,
        weights: TopicWeights,
        clock: Clock,
    ) -> Self {
        let state = mastery_service::load_or_init(storage.state.as_ref(), sections).await;
        Self {
            mastery: MasteryService::new().with_clock(clock),
            sessions: SessionService::with_clock(clock),
            selector: QuestionSelector::new().with_weights(weights),
            clock,
            state,
            storage,
        }
    }

    /// Record an answer and persist the updated state.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Mastery` for unknown sections or persistence
    /// failures; the state is untouched (or rolled back) either way.
    pub async fn record_answer(&mut self, event: &AnswerEvent) -> Result<AnswerOutcome, EngineError> {
        let outcome = self
            .mastery
            .record_answer(&mut self.state, event, self.storage.state.as_ref())
            .await?;
        Ok(outcome)
    }

    /// Assemble a practice set from the catalog for the current state.
    #[must_use]
    pub fn select_questions(
        &self,
        catalog: &[QuestionRecord],
        criteria: &SelectionCriteria,
    ) -> Vec<SelectedQuestion> {
        self.selector
            .select(catalog, &self.state, criteria, self.clock.now())
    }

    /// Summarize the learner's standing against a catalog of `catalog_size`
    /// questions.
    #[must_use]
    pub fn performance_summary(&self, catalog_size: usize) -> PerformanceSummary {
        performance_summary(&self.state, catalog_size)
    }

    /// Start a practice session.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Session` if the session stamp cannot be
    /// persisted.
    pub async fn start_session(&mut self) -> Result<DateTime<Utc>, EngineError> {
        let started = self
            .sessions
            .start_session(&mut self.state, self.storage.state.as_ref())
            .await?;
        Ok(started)
    }

    /// End the open session and report on it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Session` when no session is open or persistence
    /// fails.
    pub async fn end_session(&mut self) -> Result<SessionReport, EngineError> {
        let report = self
            .sessions
            .end_session(&mut self.state, self.storage.state.as_ref())
            .await?;
        Ok(report)
    }

    /// Wipe all progress, in storage and in memory.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Mastery` if storage cannot be cleared; the
    /// in-memory state is left intact in that case.
    pub async fn reset(&mut self) -> Result<(), EngineError> {
        mastery_service::reset_state(&mut self.state, self.storage.state.as_ref()).await?;
        Ok(())
    }

    /// Read-only view of the current adaptive state.
    #[must_use]
    pub fn state(&self) -> &AdaptiveState {
        &self.state
    }
}
