use thiserror::Error;

use crate::model::AttemptHistoryError;
use crate::model::SectionPerformanceError;
use crate::model::StateError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    AttemptHistory(#[from] AttemptHistoryError),
    #[error(transparent)]
    SectionPerformance(#[from] SectionPerformanceError),
}
