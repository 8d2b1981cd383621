#![forbid(unsafe_code)]

pub mod engine;
pub mod error;
pub mod mastery_service;
pub mod selector;
pub mod session_service;
pub mod summary;

pub use engine::PracticeEngine;
pub use error::{EngineError, MasteryServiceError, SessionError};
pub use mastery_service::MasteryService;
pub use selector::{
    DifficultyTarget, QuestionSelector, SelectedQuestion, SelectionCriteria, SelectionReason,
    TopicWeights,
};
pub use session_service::{SessionReport, SessionService};
pub use summary::{PerformanceSummary, SectionSummary, performance_summary};
