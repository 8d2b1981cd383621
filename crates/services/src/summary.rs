use serde::{Deserialize, Serialize};

use prep_core::model::{AdaptiveState, Difficulty, SectionId};

/// Sections at or above this lifetime accuracy count as strong.
pub const STRONG_SECTION_THRESHOLD: f64 = 0.85;

/// Weight of accuracy (versus coverage) in the readiness score.
const READINESS_ACCURACY_WEIGHT: f64 = 0.7;

//
// ─── SUMMARY TYPES ─────────────────────────────────────────────────────────────
//

/// Per-section slice of the performance summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub section: SectionId,
    pub attempts: u32,
    pub accuracy: f64,
    pub recent_accuracy: f64,
    pub needs_work: bool,
}

/// Snapshot of where the learner stands, for dashboards and end-of-session
/// review screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_answered: u64,
    pub overall_accuracy: f64,
    pub recent_accuracy: f64,
    pub difficulty: Difficulty,
    /// Blended 0-100 readiness estimate. Not a pass prediction, a trend
    /// indicator.
    pub readiness: u8,
    pub sections: Vec<SectionSummary>,
    pub weak_sections: Vec<SectionId>,
    pub strong_sections: Vec<SectionId>,
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

/// Derive the full performance summary from the state.
///
/// Readiness blends lifetime accuracy (70%) with catalog coverage (30%),
/// where coverage is the share of distinct questions attempted. A learner
/// acing a tenth of the bank is not ready; neither is one who has seen
/// everything and misses half.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn performance_summary(state: &AdaptiveState, catalog_size: usize) -> PerformanceSummary {
    let sections: Vec<SectionSummary> = state
        .sections()
        .iter()
        .map(|(id, perf)| SectionSummary {
            section: id.clone(),
            attempts: perf.attempts(),
            accuracy: perf.accuracy(),
            recent_accuracy: perf.recent_accuracy(),
            needs_work: perf.needs_work(),
        })
        .collect();

    let weak_sections = sections
        .iter()
        .filter(|s| s.needs_work)
        .map(|s| s.section.clone())
        .collect();
    let strong_sections = sections
        .iter()
        .filter(|s| s.attempts > 0 && s.accuracy >= STRONG_SECTION_THRESHOLD)
        .map(|s| s.section.clone())
        .collect();

    let coverage = if catalog_size == 0 {
        0.0
    } else {
        (state.attempts().len() as f64 / catalog_size as f64).min(1.0)
    };
    let accuracy = state.overall_accuracy();
    let readiness = (100.0
        * (READINESS_ACCURACY_WEIGHT * accuracy + (1.0 - READINESS_ACCURACY_WEIGHT) * coverage))
        .round() as u8;

    PerformanceSummary {
        total_answered: state.total_answered(),
        overall_accuracy: accuracy,
        recent_accuracy: state.recent_accuracy(),
        difficulty: state.difficulty(),
        readiness,
        sections,
        weak_sections,
        strong_sections,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
