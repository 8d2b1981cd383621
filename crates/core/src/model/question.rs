use serde::{Deserialize, Serialize};

use crate::model::{QuestionId, SectionId, TopicId};

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Ordered difficulty tier for questions and for the adaptive target.
///
/// The ordering `Easy < Medium < Hard` is load-bearing: the difficulty
/// adapter steps one tier at a time and saturates at the ends.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Next tier up, saturating at `Hard`.
    #[must_use]
    pub fn step_up(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium | Difficulty::Hard => Difficulty::Hard,
        }
    }

    /// Next tier down, saturating at `Easy`.
    #[must_use]
    pub fn step_down(self) -> Self {
        match self {
            Difficulty::Hard => Difficulty::Medium,
            Difficulty::Medium | Difficulty::Easy => Difficulty::Easy,
        }
    }

    /// Stable string form used at the storage boundary.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parse the storage string form. Returns `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

//
// ─── QUESTION RECORD ───────────────────────────────────────────────────────────
//

/// Read-only view of one multiple-choice item from the content bank.
///
/// The engine never mutates question records; it only reads identity,
/// section/topic placement, difficulty, and concept tags. Prompt text,
/// choices, and explanations stay with the content collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    id: QuestionId,
    section: SectionId,
    topic: Option<TopicId>,
    difficulty: Difficulty,
    concepts: Vec<String>,
}

impl QuestionRecord {
    #[must_use]
    pub fn new(
        id: QuestionId,
        section: SectionId,
        topic: Option<TopicId>,
        difficulty: Difficulty,
        concepts: Vec<String>,
    ) -> Self {
        Self {
            id,
            section,
            topic,
            difficulty,
            concepts,
        }
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn section(&self) -> &SectionId {
        &self.section
    }

    #[must_use]
    pub fn topic(&self) -> Option<&TopicId> {
        self.topic.as_ref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn concepts(&self) -> &[String] {
        &self.concepts
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
