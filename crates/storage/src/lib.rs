//! Storage Layer
//!
//! Key/value stores behind a trait, with an assessment repository that
//! publishes change notifications.

mod repository;
mod store;

pub use repository::{AssessmentRecord, AssessmentRepository, RepositoryEvent};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Record not found")]
    NotFound,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
