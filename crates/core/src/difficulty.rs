use crate::model::Difficulty;

/// Minimum number of recent results before the tier may move at all.
/// Avoids noisy adjustment in the first few answers of a fresh state.
pub const MIN_SAMPLE: usize = 5;

/// Number of most-recent results considered when measuring accuracy.
pub const ACCURACY_WINDOW: usize = 10;

//
// ─── DIFFICULTY ADAPTER ────────────────────────────────────────────────────────
//

/// Maintains the single rolling "current difficulty" tier from recent
/// answer correctness.
///
/// A three-state ordered machine (easy ⇄ medium ⇄ hard) with hysteresis:
/// the step-up and step-down thresholds straddle the comfortable 0.70–0.85
/// band so the tier does not oscillate every few answers.
#[derive(Debug, Clone, Copy)]
pub struct DifficultyAdapter {
    min_sample: usize,
    window: usize,
    step_up_threshold: f64,
    step_down_threshold: f64,
}

impl Default for DifficultyAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DifficultyAdapter {
    /// Adapter with the standard thresholds (≥ 0.85 up, ≤ 0.60 down).
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_sample: MIN_SAMPLE,
            window: ACCURACY_WINDOW,
            step_up_threshold: 0.85,
            step_down_threshold: 0.60,
        }
    }

    /// Decide the next tier from the current tier and the recent-results
    /// window (oldest first). Returns the current tier unchanged when there
    /// is not enough data or accuracy sits inside the comfort band.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn adjust(&self, current: Difficulty, recent_results: &[bool]) -> Difficulty {
        if recent_results.len() < self.min_sample {
            return current;
        }

        let window_start = recent_results.len().saturating_sub(self.window);
        let window = &recent_results[window_start..];
        let correct = window.iter().filter(|r| **r).count();
        let accuracy = correct as f64 / window.len() as f64;

        if accuracy >= self.step_up_threshold {
            current.step_up()
        } else if accuracy <= self.step_down_threshold {
            current.step_down()
        } else {
            current
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
