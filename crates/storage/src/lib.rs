#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AttemptRecord, InMemoryStateRepository, SectionRecord, StateRepository, StateSnapshot, Storage,
    StorageError, TopicRecord,
};
