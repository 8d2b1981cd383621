use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use prep_core::model::AdaptiveState;
use prep_core::time::{Clock, minutes_between};
use storage::repository::{StateRepository, StateSnapshot};

use crate::error::SessionError;

//
// ─── SESSION REPORT ────────────────────────────────────────────────────────────
//

/// What a finished practice session looked like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Whole minutes from start to end, floored at zero.
    pub elapsed_minutes: i64,
    /// How many distinct questions sit in the seen window right now.
    pub questions_seen: usize,
    /// Accuracy over the global recent-results window at session end.
    pub recent_accuracy: f64,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Stamps session boundaries onto the state and persists them.
///
/// Only one session can be open at a time; starting a new one simply
/// replaces the stamp. Ending produces a [`SessionReport`] and clears the
/// stamp so a restart mid-session cannot report a phantom session later.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionService {
    clock: Clock,
}

impl SessionService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }

    /// Mark the start of a practice session and persist the stamp.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if persistence fails; the in-memory
    /// stamp is rolled back so memory and disk agree.
    pub async fn start_session(
        &self,
        state: &mut AdaptiveState,
        repo: &dyn StateRepository,
    ) -> Result<DateTime<Utc>, SessionError> {
        let previous = state.session_started_at();
        let now = self.clock.now();
        state.start_session(now);

        match repo.save(&StateSnapshot::from_state(state)).await {
            Ok(()) => Ok(now),
            Err(err) => {
                match previous {
                    Some(at) => state.start_session(at),
                    None => {
                        state.take_session_start();
                    }
                }
                Err(err.into())
            }
        }
    }

    /// Close the open session and summarize it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` when no session is open, and
    /// `SessionError::Storage` (with the stamp restored) if persistence
    /// fails.
    pub async fn end_session(
        &self,
        state: &mut AdaptiveState,
        repo: &dyn StateRepository,
    ) -> Result<SessionReport, SessionError> {
        let started_at = state.take_session_start().ok_or(SessionError::NotStarted)?;
        let ended_at = self.clock.now();

        if let Err(err) = repo.save(&StateSnapshot::from_state(state)).await {
            state.start_session(started_at);
            return Err(err.into());
        }

        Ok(SessionReport {
            started_at,
            ended_at,
            elapsed_minutes: minutes_between(started_at, ended_at),
            questions_seen: state.recently_seen().len(),
            recent_accuracy: state.recent_accuracy(),
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use prep_core::difficulty::DifficultyAdapter;
    use prep_core::model::{AnswerEvent, QuestionId, SectionId};
    use prep_core::scheduler::Scheduler;
    use prep_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryStateRepository;

    fn state() -> AdaptiveState {
        AdaptiveState::new([SectionId::new("networking")])
    }

    #[tokio::test]
    async fn start_persists_the_stamp() {
        let repo = InMemoryStateRepository::new();
        let mut s = state();

        let started = SessionService::with_clock(fixed_clock())
            .start_session(&mut s, &repo)
            .await
            .unwrap();

        assert_eq!(started, fixed_now());
        let persisted = repo.load().await.unwrap().unwrap().into_state().unwrap();
        assert_eq!(persisted.session_started_at(), Some(fixed_now()));
    }

    #[tokio::test]
    async fn end_without_start_is_an_error() {
        let repo = InMemoryStateRepository::new();
        let mut s = state();

        let err = SessionService::with_clock(fixed_clock())
            .end_session(&mut s, &repo)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotStarted));
    }

    #[tokio::test]
    async fn end_reports_elapsed_time_and_clears_the_stamp() {
        let repo = InMemoryStateRepository::new();
        let mut s = state();
        for i in 0..4 {
            s.record_answer(
                &AnswerEvent::new(
                    QuestionId::new(format!("q{i}")),
                    SectionId::new("networking"),
                    i % 2 == 0,
                ),
                &Scheduler::new(),
                &DifficultyAdapter::new(),
                fixed_now(),
            )
            .unwrap();
        }

        SessionService::with_clock(fixed_clock())
            .start_session(&mut s, &repo)
            .await
            .unwrap();

        let later = Clock::fixed(fixed_now() + Duration::minutes(25));
        let report = SessionService::with_clock(later)
            .end_session(&mut s, &repo)
            .await
            .unwrap();

        assert_eq!(report.started_at, fixed_now());
        assert_eq!(report.elapsed_minutes, 25);
        assert_eq!(report.questions_seen, 4);
        assert_eq!(report.recent_accuracy, 0.5);
        assert_eq!(s.session_started_at(), None);

        let persisted = repo.load().await.unwrap().unwrap().into_state().unwrap();
        assert_eq!(persisted.session_started_at(), None);
    }

    #[tokio::test]
    async fn restarting_replaces_the_stamp() {
        let repo = InMemoryStateRepository::new();
        let mut s = state();
        let service = SessionService::with_clock(fixed_clock());
        service.start_session(&mut s, &repo).await.unwrap();

        let later = fixed_now() + Duration::minutes(10);
        SessionService::with_clock(Clock::fixed(later))
            .start_session(&mut s, &repo)
            .await
            .unwrap();

        assert_eq!(s.session_started_at(), Some(later));
    }
}
