//! Application configuration

use std::path::PathBuf;
use std::time::Duration;

use camera_capture::CaptureConstraints;
use emotion_sampler::{ModelAssets, SamplerConfig};
use risk_engine::{RiskConfig, ROUND_SIZE};
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `MINDCHECK__SAMPLER__POLL_INTERVAL_MS`
pub const ENV_PREFIX: &str = "MINDCHECK";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CaptureConstraints,
    pub capture: CaptureConfig,
    pub sampler: SamplerConfig,
    pub models: ModelAssets,
    pub questionnaire: QuestionnaireConfig,
    pub risk: RiskConfig,
    pub storage: StorageConfig,
}

/// How the service drives one emotion capture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Give up waiting for a clear face after this long (milliseconds)
    pub face_wait_ms: u64,
    /// Analyses attempted before insufficient samples become an error
    pub attempts: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            face_wait_ms: 30_000,
            attempts: 3,
        }
    }
}

impl CaptureConfig {
    pub fn face_wait(&self) -> Duration {
        Duration::from_millis(self.face_wait_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionnaireConfig {
    /// Questions drawn per round
    pub round_size: usize,
}

impl Default for QuestionnaireConfig {
    fn default() -> Self {
        Self {
            round_size: ROUND_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding saved assessments
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("mindcheck-data.json"),
        }
    }
}

impl AppConfig {
    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
