mod attempt;
mod ids;
mod question;
mod section;
mod state;

pub use attempt::{AttemptHistory, AttemptHistoryError, INITIAL_EASE_FACTOR, MIN_EASE_FACTOR};
pub use ids::{QuestionId, SectionId, TopicId};
pub use question::{Difficulty, QuestionRecord};
pub use section::{
    NEEDS_WORK_THRESHOLD, SECTION_RECENT_WINDOW, SectionPerformance, SectionPerformanceError,
    TopicStats,
};
pub use state::{
    AdaptiveState, AnswerEvent, AnswerOutcome, RECENT_RESULTS_WINDOW, RECENTLY_SEEN_WINDOW,
    StateError,
};
