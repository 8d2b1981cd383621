use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::TopicId;

/// Size of the per-section rolling results window.
pub const SECTION_RECENT_WINDOW: usize = 10;

/// Sections with overall accuracy below this are flagged as needing work.
pub const NEEDS_WORK_THRESHOLD: f64 = 0.70;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised when rehydrating a `SectionPerformance` from storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SectionPerformanceError {
    #[error("correct count {correct} exceeds attempt count {attempts}")]
    CorrectExceedsAttempts { correct: u32, attempts: u32 },

    #[error("topic {topic} has correct count {correct} exceeding attempts {attempts}")]
    InvalidTopicCounts {
        topic: TopicId,
        correct: u32,
        attempts: u32,
    },
}

//
// ─── TOPIC STATS ───────────────────────────────────────────────────────────────
//

/// Attempt/correct counters for a single topic within a section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicStats {
    attempts: u32,
    correct: u32,
}

impl TopicStats {
    #[must_use]
    pub fn new(attempts: u32, correct: u32) -> Self {
        Self { attempts, correct }
    }

    pub fn record(&mut self, is_correct: bool) {
        self.attempts = self.attempts.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
        }
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            f64::from(self.correct) / f64::from(self.attempts)
        }
    }
}

//
// ─── SECTION PERFORMANCE ───────────────────────────────────────────────────────
//

/// Aggregate performance for one top-level exam section.
///
/// Counters are maintained incrementally by the record-answer path and must
/// always equal a from-scratch recomputation over the attempt histories of
/// the section; `needs_work` is derived, never stored.
///
/// The `mastered` and `struggling` concept sets are deliberately independent:
/// a concept answered correctly once and missed later is in both, which reads
/// as "historically mastered, currently regressing".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionPerformance {
    attempts: u32,
    correct: u32,
    recent_results: VecDeque<bool>,
    mastered: BTreeSet<String>,
    struggling: BTreeSet<String>,
    topics: BTreeMap<TopicId, TopicStats>,
}

impl SectionPerformance {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a section from persisted storage, validating counts.
    ///
    /// The recent window is truncated to the newest `SECTION_RECENT_WINDOW`
    /// entries if the stored form is oversized.
    ///
    /// # Errors
    ///
    /// Returns `SectionPerformanceError` if section or topic counters are
    /// inconsistent.
    pub fn from_persisted(
        attempts: u32,
        correct: u32,
        recent_results: Vec<bool>,
        mastered: BTreeSet<String>,
        struggling: BTreeSet<String>,
        topics: BTreeMap<TopicId, TopicStats>,
    ) -> Result<Self, SectionPerformanceError> {
        if correct > attempts {
            return Err(SectionPerformanceError::CorrectExceedsAttempts { correct, attempts });
        }
        for (topic, stats) in &topics {
            if stats.correct() > stats.attempts() {
                return Err(SectionPerformanceError::InvalidTopicCounts {
                    topic: topic.clone(),
                    correct: stats.correct(),
                    attempts: stats.attempts(),
                });
            }
        }

        let mut recent: VecDeque<bool> = recent_results.into();
        while recent.len() > SECTION_RECENT_WINDOW {
            recent.pop_front();
        }

        Ok(Self {
            attempts,
            correct,
            recent_results: recent,
            mastered,
            struggling,
            topics,
        })
    }

    /// Fold one answer into the section aggregates.
    ///
    /// Updates counters, the rolling window, the topic map (when a topic is
    /// given), and the concept mastery sets.
    pub fn record(&mut self, is_correct: bool, topic: Option<&TopicId>, concepts: &[String]) {
        self.attempts = self.attempts.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
        }

        self.recent_results.push_back(is_correct);
        while self.recent_results.len() > SECTION_RECENT_WINDOW {
            self.recent_results.pop_front();
        }

        if let Some(topic) = topic {
            self.topics.entry(topic.clone()).or_default().record(is_correct);
        }

        for concept in concepts {
            if is_correct {
                self.struggling.remove(concept);
                self.mastered.insert(concept.clone());
            } else {
                self.struggling.insert(concept.clone());
            }
        }
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    /// Lifetime accuracy for the section; `0.0` before any attempt.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            f64::from(self.correct) / f64::from(self.attempts)
        }
    }

    /// Fraction correct within the section's rolling window.
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

    /// True once the section has attempts and its accuracy sits below the
    /// needs-work threshold.
    #[must_use]
    pub fn needs_work(&self) -> bool {
        self.attempts > 0 && self.accuracy() < NEEDS_WORK_THRESHOLD
    }

    #[must_use]
    pub fn recent_results(&self) -> &VecDeque<bool> {
        &self.recent_results
    }

    #[must_use]
    pub fn mastered(&self) -> &BTreeSet<String> {
        &self.mastered
    }

    #[must_use]
    pub fn struggling(&self) -> &BTreeSet<String> {
        &self.struggling
    }

    #[must_use]
    pub fn topics(&self) -> &BTreeMap<TopicId, TopicStats> {
        &self.topics
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: &str) -> TopicId {
        TopicId::new(id)
    }

    #[test]
    fn record_updates_counters_and_topic() {
        let mut s = SectionPerformance::new();
        let t = topic("subnetting");

        s.record(true, Some(&t), &[]);
        s.record(false, Some(&t), &[]);
        s.record(true, None, &[]);

        assert_eq!(s.attempts(), 3);
        assert_eq!(s.correct(), 2);
        assert!((s.accuracy() - 2.0 / 3.0).abs() < 1e-9);

        let stats = s.topics().get(&t).copied().unwrap();
        assert_eq!(stats.attempts(), 2);
        assert_eq!(stats.correct(), 1);
        assert_eq!(stats.accuracy(), 0.5);
    }

    #[test]
    fn recent_window_is_bounded() {
        let mut s = SectionPerformance::new();
        for _ in 0..SECTION_RECENT_WINDOW {
            s.record(false, None, &[]);
        }
        for _ in 0..5 {
            s.record(true, None, &[]);
        }

        assert_eq!(s.recent_results().len(), SECTION_RECENT_WINDOW);
        // The five most recent results are the correct ones.
        assert_eq!(s.recent_accuracy(), 0.5);
    }

    #[test]
    fn needs_work_thresholds() {
        let mut s = SectionPerformance::new();
        assert!(!s.needs_work(), "no attempts yet");

        s.record(false, None, &[]);
        assert!(s.needs_work());

        for _ in 0..9 {
            s.record(true, None, &[]);
        }
        // 9/10 = 0.9 >= 0.70
        assert!(!s.needs_work());
    }

    #[test]
    fn concept_sets_are_independent() {
        let mut s = SectionPerformance::new();
        let concepts = vec!["cidr".to_string()];

        s.record(false, None, &concepts);
        assert!(s.struggling().contains("cidr"));
        assert!(!s.mastered().contains("cidr"));

        s.record(true, None, &concepts);
        assert!(s.mastered().contains("cidr"));
        assert!(!s.struggling().contains("cidr"));

        // A later miss re-flags the concept without revoking mastery.
        s.record(false, None, &concepts);
        assert!(s.mastered().contains("cidr"));
        assert!(s.struggling().contains("cidr"));
    }

    #[test]
    fn from_persisted_validates_counts() {
        let err = SectionPerformance::from_persisted(
            1,
            2,
            Vec::new(),
            BTreeSet::new(),
            BTreeSet::new(),
            BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SectionPerformanceError::CorrectExceedsAttempts { .. }
        ));

        let mut topics = BTreeMap::new();
        topics.insert(topic("t"), TopicStats::new(1, 2));
        let err = SectionPerformance::from_persisted(
            2,
            2,
            Vec::new(),
            BTreeSet::new(),
            BTreeSet::new(),
            topics,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SectionPerformanceError::InvalidTopicCounts { .. }
        ));
    }

    #[test]
    fn from_persisted_truncates_oversized_window() {
        let stored = vec![false; SECTION_RECENT_WINDOW + 4];
        let s = SectionPerformance::from_persisted(
            20,
            0,
            stored,
            BTreeSet::new(),
            BTreeSet::new(),
            BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(s.recent_results().len(), SECTION_RECENT_WINDOW);
    }
}
