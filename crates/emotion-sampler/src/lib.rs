//! Emotion Sampler
//!
//! Bounded webcam emotion estimation:
//! - Throttled polling of a face detection + expression model
//! - Calibration and analysis windows driven by a caller command
//! - Confidence-weighted aggregation into a single estimate
//! - Cancellation that always releases the camera

pub mod aggregate;
pub mod config;
pub mod detector;
pub mod emotion;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod sampler;
pub mod simulated;
pub mod state;

pub use aggregate::{EmotionEstimate, FrameAggregator};
pub use config::SamplerConfig;
pub use detector::{ExpressionModel, ModelAssets, ModelLoader, SharedModel};
#[cfg(feature = "onnx")]
pub use onnx::{OnnxExpressionModel, OnnxLoader};
pub use emotion::{Emotion, EmotionProbabilities, FrameDetection, RawDetection};
pub use sampler::{EmotionSampler, SamplerCommand, SamplerHandle};
pub use simulated::{SimulatedLoader, SimulatedModel};
pub use state::{SamplerPhase, SamplerStatus};

use camera_capture::CameraError;
use thiserror::Error;

/// Errors raised by a single detection call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    /// The model cannot be used any more; the session must fail
    #[error("Model unusable: {0}")]
    ModelUnusable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    /// Output did not pass boundary validation
    #[error("Invalid model output: {0}")]
    InvalidOutput(String),
}

/// Sampling session errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplerError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Face/expression model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model loading timed out after {0}ms")]
    ModelLoadTimeout(u64),

    #[error("Video stream not ready")]
    VideoNotReady,

    #[error("Not enough valid frames: {accepted} accepted, {required} required")]
    InsufficientSamples { accepted: usize, required: usize },

    #[error("Sampling cancelled")]
    Cancelled,

    #[error("Face not clearly visible (confidence {confidence:.2})")]
    FaceNotReady { confidence: f32 },

    #[error("Analysis already in progress")]
    AnalysisInProgress,

    #[error("Detection failed repeatedly: {0}")]
    Detection(String),
}

impl SamplerError {
    /// Errors after which the caller may simply start another analysis
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SamplerError::InsufficientSamples { .. }
                | SamplerError::FaceNotReady { .. }
                | SamplerError::AnalysisInProgress
        )
    }
}
