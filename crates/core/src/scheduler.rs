use chrono::{DateTime, Duration, Utc};

use crate::model::{AttemptHistory, MIN_EASE_FACTOR};

//
// ─── REVIEW SCHEDULE ───────────────────────────────────────────────────────────
//

/// Scheduling decision for one question after one answer.
///
/// Produced by [`Scheduler::next_schedule`] and installed on the question's
/// `AttemptHistory` by the record-answer path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewSchedule {
    pub interval_days: u32,
    pub ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// SM-2-style spaced-repetition scheduler.
///
/// Correct answers space reviews out exponentially via the ease factor
/// (1 day, then 6 days, then `round(interval × ease)`); a single miss
/// collapses the interval back to 1 day and narrows the ease factor, which
/// permanently slows interval growth for that question until later
/// successes rebuild it.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    first_interval_days: u32,
    second_interval_days: u32,
    ease_bonus: f64,
    ease_penalty: f64,
    min_ease: f64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Scheduler with the standard SM-2 parameters (1d/6d bootstrap,
    /// ±0.1/0.2 ease steps, 1.3 floor).
    #[must_use]
    pub fn new() -> Self {
        Self {
            first_interval_days: 1,
            second_interval_days: 6,
            ease_bonus: 0.1,
            ease_penalty: 0.2,
            min_ease: MIN_EASE_FACTOR,
        }
    }

    /// Compute the next review schedule for a question.
    ///
    /// Expects `history` to already include the answer being scheduled
    /// (i.e. `record_result` ran first), so `attempts() == 1` means this is
    /// the first-ever attempt. The previous interval and ease factor on the
    /// history are the inputs; nothing is mutated here.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn next_schedule(
        &self,
        history: &AttemptHistory,
        is_correct: bool,
        answered_at: DateTime<Utc>,
    ) -> ReviewSchedule {
        let (interval_days, ease_factor) = if is_correct {
            let interval = match history.attempts() {
                0 | 1 => self.first_interval_days,
                2 => self.second_interval_days,
                _ => {
                    // Grow from the previous interval using the ease factor
                    // as it stood before this answer.
                    let grown = f64::from(history.interval_days()) * history.ease_factor();
                    (grown.round() as u32).max(1)
                }
            };
            (interval, history.ease_factor() + self.ease_bonus)
        } else {
            (
                self.first_interval_days,
                (history.ease_factor() - self.ease_penalty).max(self.min_ease),
            )
        };

        ReviewSchedule {
            interval_days,
            ease_factor,
            next_review_at: answered_at + Duration::days(i64::from(interval_days)),
        }
    }

    /// Whether a question is due for scheduled review.
    ///
    /// Due means the next-review timestamp has passed **and** the most
    /// recent result was incorrect. Consistently-correct questions are not
    /// resurfaced through this channel; natural rotation covers them.
    #[must_use]
    pub fn is_due(&self, history: &AttemptHistory, now: DateTime<Utc>) -> bool {
        if history.attempts() == 0 || history.last_correct() {
            return false;
        }
        history.next_review_at().is_some_and(|at| at <= now)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
