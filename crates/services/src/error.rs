//! Shared error types for the services crate.

use thiserror::Error;

use prep_core::model::StateError;
use storage::repository::StorageError;

/// Errors emitted by `MasteryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MasteryServiceError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no session in progress")]
    NotStarted,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the `PracticeEngine` facade.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error(transparent)]
    Mastery(#[from] MasteryServiceError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
