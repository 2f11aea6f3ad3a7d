//! Self-assessment orchestration
//!
//! Wires the capture session, emotion sampler, risk engine and storage into
//! one assessment flow, and hosts configuration loading and logging setup.

pub mod config;
pub mod service;

pub use config::{AppConfig, CaptureConfig, QuestionnaireConfig, StorageConfig};
pub use service::AssessmentService;

use camera_capture::CameraError;
use emotion_sampler::SamplerError;
use risk_engine::RiskError;
use storage::StorageError;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Emotion sampling failed: {0}")]
    Sampler(#[from] SamplerError),

    #[error("Scoring failed: {0}")]
    Risk(#[from] RiskError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("No clear face within {0}ms")]
    FaceTimeout(u64),

    #[error("{remaining} more activities needed before the follow-up assessment")]
    ActivitiesIncomplete { remaining: usize },
}

/// Initialize logging; `RUST_LOG` overrides `default_level`
pub fn init_logging(default_level: &str) -> Result<(), AssessmentError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AssessmentError::Logging(e.to_string()))
}
