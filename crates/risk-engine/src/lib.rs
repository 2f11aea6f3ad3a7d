//! Risk Engine
//!
//! Turns a questionnaire round and an optional emotion estimate into a
//! risk score and level:
//! - Per-category averages normalized to 0-1 with advisory recommendations
//! - Fixed emotion modifier lookup blended with the questionnaire score
//! - Half-open risk level thresholds
//! - Follow-up comparison after wellness activities

pub mod activity;
pub mod aggregator;
pub mod questionnaire;
pub mod result;

pub use activity::{catalog, ActivityKind, ActivitySession, WellnessActivity, REQUIRED_COMPLETIONS};
pub use aggregator::{RiskAggregator, RiskConfig};
pub use questionnaire::{Answer, Category, Question, QuestionBank, ResponseSet, ROUND_SIZE};
pub use result::{AssessmentResult, CategoryMetric, Improvement, Interpretation, RiskLevel};

use thiserror::Error;

/// Risk scoring errors. All of them are caller contract violations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("No responses for any category in the active question set")]
    EmptyResponseSet,

    #[error("Question {0} has no response")]
    MissingResponse(String),

    #[error("Answer {0} outside 1-5")]
    InvalidAnswer(i64),

    #[error("Unknown question: {0}")]
    UnknownQuestion(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown activity: {0}")]
    UnknownActivity(String),
}
