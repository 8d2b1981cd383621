use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Floor for the SM-2 ease factor. Repeated failures may never push a
/// question's ease below this value.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor assigned to a question before its first attempt.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised when rehydrating an `AttemptHistory` from storage.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum AttemptHistoryError {
    #[error("correct count {correct} exceeds attempt count {attempts}")]
    CorrectExceedsAttempts { correct: u32, attempts: u32 },

    #[error("ease factor {provided} is below the floor {MIN_EASE_FACTOR}")]
    EaseBelowFloor { provided: f64 },

    #[error("attempted question is missing a review interval")]
    MissingInterval,

    #[error("attempted question is missing its last-attempt timestamp")]
    MissingLastAttempt,
}

//
// ─── ATTEMPT HISTORY ───────────────────────────────────────────────────────────
//

/// Per-question attempt record and SM-2 scheduling state.
///
/// Owned exclusively by `AdaptiveState`; mutation happens only through the
/// record-answer path so the invariants below always hold:
///
/// - `correct <= attempts`
/// - `ease_factor >= MIN_EASE_FACTOR`
/// - `interval_days >= 1` once the question has been attempted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptHistory {
    attempts: u32,
    correct: u32,
    last_attempt_at: Option<DateTime<Utc>>,
    last_correct: bool,
    ease_factor: f64,
    interval_days: u32,
    next_review_at: Option<DateTime<Utc>>,
}

impl Default for AttemptHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptHistory {
    /// Fresh history for a never-attempted question.
    #[must_use]
    pub fn new() -> Self {
        Self {
            attempts: 0,
            correct: 0,
            last_attempt_at: None,
            last_correct: false,
            ease_factor: INITIAL_EASE_FACTOR,
            interval_days: 0,
            next_review_at: None,
        }
    }

    /// Rehydrate a history from persisted storage, validating invariants.
    ///
    /// # Errors
    ///
    /// Returns `AttemptHistoryError` if the stored values violate any
    /// invariant (counts, ease floor, or missing schedule fields for an
    /// attempted question).
    pub fn from_persisted(
        attempts: u32,
        correct: u32,
        last_attempt_at: Option<DateTime<Utc>>,
        last_correct: bool,
        ease_factor: f64,
        interval_days: u32,
        next_review_at: Option<DateTime<Utc>>,
    ) -> Result<Self, AttemptHistoryError> {
        if correct > attempts {
            return Err(AttemptHistoryError::CorrectExceedsAttempts { correct, attempts });
        }
        if ease_factor < MIN_EASE_FACTOR {
            return Err(AttemptHistoryError::EaseBelowFloor {
                provided: ease_factor,
            });
        }
        if attempts > 0 {
            if interval_days == 0 {
                return Err(AttemptHistoryError::MissingInterval);
            }
            if last_attempt_at.is_none() {
                return Err(AttemptHistoryError::MissingLastAttempt);
            }
        }

        Ok(Self {
            attempts,
            correct,
            last_attempt_at,
            last_correct,
            ease_factor,
            interval_days,
            next_review_at,
        })
    }

    /// Count this answer: bumps attempt/correct counters and stamps the
    /// last-attempt fields. Scheduling is applied separately.
    pub fn record_result(&mut self, is_correct: bool, answered_at: DateTime<Utc>) {
        self.attempts = self.attempts.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
        }
        self.last_attempt_at = Some(answered_at);
        self.last_correct = is_correct;
    }

    /// Install the scheduler's decision for this question.
    ///
    /// Values are normalized so the invariants hold even for out-of-range
    /// input: interval is at least 1 day, ease never drops below the floor.
    pub fn apply_schedule(
        &mut self,
        interval_days: u32,
        ease_factor: f64,
        next_review_at: DateTime<Utc>,
    ) {
        self.interval_days = interval_days.max(1);
        self.ease_factor = ease_factor.max(MIN_EASE_FACTOR);
        self.next_review_at = Some(next_review_at);
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    /// Lifetime accuracy for this question; `0.0` before the first attempt.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            f64::from(self.correct) / f64::from(self.attempts)
        }
    }

    #[must_use]
    pub fn last_attempt_at(&self) -> Option<DateTime<Utc>> {
        self.last_attempt_at
    }

    #[must_use]
    pub fn last_correct(&self) -> bool {
        self.last_correct
    }

    #[must_use]
    pub fn ease_factor(&self) -> f64 {
        self.ease_factor
    }

    #[must_use]
    pub fn interval_days(&self) -> u32 {
        self.interval_days
    }

    #[must_use]
    pub fn next_review_at(&self) -> Option<DateTime<Utc>> {
        self.next_review_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn fresh_history_has_initial_ease_and_no_schedule() {
        let h = AttemptHistory::new();
        assert_eq!(h.attempts(), 0);
        assert_eq!(h.correct(), 0);
        assert_eq!(h.ease_factor(), INITIAL_EASE_FACTOR);
        assert_eq!(h.interval_days(), 0);
        assert_eq!(h.next_review_at(), None);
        assert_eq!(h.accuracy(), 0.0);
    }

    #[test]
    fn record_result_counts_and_stamps() {
        let mut h = AttemptHistory::new();
        let now = fixed_now();

        h.record_result(true, now);
        assert_eq!(h.attempts(), 1);
        assert_eq!(h.correct(), 1);
        assert_eq!(h.last_attempt_at(), Some(now));
        assert!(h.last_correct());

        h.record_result(false, now);
        assert_eq!(h.attempts(), 2);
        assert_eq!(h.correct(), 1);
        assert!(!h.last_correct());
        assert_eq!(h.accuracy(), 0.5);
    }

    #[test]
    fn apply_schedule_clamps_to_invariants() {
        let mut h = AttemptHistory::new();
        let now = fixed_now();
        h.record_result(false, now);

        h.apply_schedule(0, 0.5, now);
        assert_eq!(h.interval_days(), 1);
        assert_eq!(h.ease_factor(), MIN_EASE_FACTOR);
        assert_eq!(h.next_review_at(), Some(now));
    }

    #[test]
    fn from_persisted_rejects_bad_counts() {
        let err = AttemptHistory::from_persisted(2, 3, Some(fixed_now()), true, 2.5, 6, None)
            .unwrap_err();
        assert!(matches!(
            err,
            AttemptHistoryError::CorrectExceedsAttempts {
                correct: 3,
                attempts: 2
            }
        ));
    }

    #[test]
    fn from_persisted_rejects_low_ease() {
        let err = AttemptHistory::from_persisted(1, 1, Some(fixed_now()), true, 1.0, 1, None)
            .unwrap_err();
        assert!(matches!(err, AttemptHistoryError::EaseBelowFloor { .. }));
    }

    #[test]
    fn from_persisted_rejects_attempted_without_schedule() {
        let err =
            AttemptHistory::from_persisted(1, 1, Some(fixed_now()), true, 2.5, 0, None).unwrap_err();
        assert!(matches!(err, AttemptHistoryError::MissingInterval));

        let err = AttemptHistory::from_persisted(1, 1, None, true, 2.5, 1, None).unwrap_err();
        assert!(matches!(err, AttemptHistoryError::MissingLastAttempt));
    }

    #[test]
    fn from_persisted_accepts_fresh_history() {
        let h = AttemptHistory::from_persisted(0, 0, None, false, INITIAL_EASE_FACTOR, 0, None)
            .unwrap();
        assert_eq!(h, AttemptHistory::new());
    }
}
