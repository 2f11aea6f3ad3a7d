//! Sampler state reported to the caller

use serde::{Deserialize, Serialize};

use crate::SamplerError;

/// Sampling phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SamplerPhase {
    /// Loading the model and waiting for the video surface
    #[default]
    Starting,
    /// Polling for a face, analysis not yet requested
    WaitingForFace,
    /// Warm-up frames after analysis was requested
    Calibrating,
    /// Collecting frames for the estimate
    Analyzing,
    /// Estimate emitted, camera released
    Finalizing,
    /// Terminal error, camera released
    Failed,
}

impl SamplerPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SamplerPhase::Finalizing | SamplerPhase::Failed)
    }

    /// Whether frames are being collected
    pub fn is_collecting(&self) -> bool {
        matches!(self, SamplerPhase::Calibrating | SamplerPhase::Analyzing)
    }
}

/// Live sampler feedback (face indicator, progress)
#[derive(Debug, Clone, Default)]
pub struct SamplerStatus {
    pub phase: SamplerPhase,
    /// Face found above the display threshold on the last poll
    pub face_detected: bool,
    /// Detector confidence on the last poll
    pub confidence: f32,
    /// Frames accepted in the current analysis
    pub accepted_frames: usize,
    /// Most recent error, retryable or not
    pub last_error: Option<SamplerError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_flags() {
        assert!(SamplerPhase::Failed.is_terminal());
        assert!(!SamplerPhase::WaitingForFace.is_terminal());
        assert!(SamplerPhase::Calibrating.is_collecting());
        assert!(!SamplerPhase::Starting.is_collecting());
    }
}
