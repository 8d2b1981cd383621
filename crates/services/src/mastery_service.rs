use prep_core::difficulty::DifficultyAdapter;
use prep_core::model::{AdaptiveState, AnswerEvent, AnswerOutcome, SectionId};
use prep_core::scheduler::Scheduler;
use prep_core::time::Clock;
use storage::repository::{StateRepository, StateSnapshot};

use crate::error::MasteryServiceError;

//
// ─── STATE BOOTSTRAP ───────────────────────────────────────────────────────────
//

/// Load the learner's state from storage, or build a fresh one.
///
/// Absent state is the normal first-run path. Corrupt or unreadable state is
/// recovered locally: the stored form is discarded with a warning and a
/// fresh state takes its place — data loss is acceptable here, silent
/// failure is not. Sections the catalog gained since the last save are
/// added with empty aggregates.
pub async fn load_or_init(
    repo: &dyn StateRepository,
    sections: impl IntoIterator<Item = SectionId>,
) -> AdaptiveState {
    let mut state = match repo.load().await {
        Ok(Some(snapshot)) => match snapshot.into_state() {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(error = %err, "discarding corrupt stored state");
                return AdaptiveState::new(sections);
            }
        },
        Ok(None) => return AdaptiveState::new(sections),
        Err(err) => {
            tracing::warn!(error = %err, "stored state unreadable, starting fresh");
            return AdaptiveState::new(sections);
        }
    };

    state.ensure_sections(sections);
    state
}

/// Explicit user-initiated reset: wipe storage, then reinitialize memory.
///
/// Storage is cleared first so a failure leaves the in-memory state (and
/// the learner's progress) untouched.
///
/// # Errors
///
/// Returns `MasteryServiceError::Storage` if the repository cannot be
/// cleared.
pub async fn reset_state(
    state: &mut AdaptiveState,
    repo: &dyn StateRepository,
) -> Result<(), MasteryServiceError> {
    repo.clear().await?;
    state.reset();
    Ok(())
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Coordinates recording an answer: core state mutation plus persistence.
///
/// Owns the scheduler and difficulty adapter so every answer flows through
/// one consistent policy; the state handle itself stays with the caller.
pub struct MasteryService {
    clock: Clock,
    scheduler: Scheduler,
    adapter: DifficultyAdapter,
}

impl Default for MasteryService {
    fn default() -> Self {
        Self::new()
    }
}

impl MasteryService {
    /// Service with the standard scheduler/adapter parameters and real time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Clock::default(),
            scheduler: Scheduler::new(),
            adapter: DifficultyAdapter::new(),
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Record one answer and persist the full state.
    ///
    /// If the save fails the in-memory state is rolled back to its previous
    /// value, so memory never drifts ahead of disk.
    ///
    /// # Errors
    ///
    /// Returns `MasteryServiceError::State` for unknown sections (state is
    /// untouched) and `MasteryServiceError::Storage` if persistence fails
    /// (state is rolled back).
    pub async fn record_answer(
        &self,
        state: &mut AdaptiveState,
        event: &AnswerEvent,
        repo: &dyn StateRepository,
    ) -> Result<AnswerOutcome, MasteryServiceError> {
        let original = state.clone();

        let outcome = state.record_answer(event, &self.scheduler, &self.adapter, self.clock.now())?;

        match repo.save(&StateSnapshot::from_state(state)).await {
            Ok(()) => Ok(outcome),
            Err(err) => {
                *state = original;
                Err(err.into())
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
