//! Sampler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Emotion sampler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Minimum gap between two detections (milliseconds)
    pub poll_interval_ms: u64,

    /// Confidence at which a face is reported as detected
    pub display_threshold: f32,

    /// Confidence required to start an analysis
    pub start_threshold: f32,

    /// Frames below this confidence are discarded during analysis
    pub acceptance_threshold: f32,

    /// Warm-up after analysis starts (milliseconds)
    pub calibration_ms: u64,

    /// Collection window after calibration (milliseconds)
    pub analysis_ms: u64,

    /// Accepted frames needed to emit an estimate
    pub min_frames: usize,

    /// Polls of the video surface before giving up on dimensions
    pub video_ready_retries: u32,

    /// Gap between video readiness polls (milliseconds)
    pub video_ready_interval_ms: u64,

    /// Consecutive detection errors tolerated before failing
    pub max_consecutive_failures: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 150,
            display_threshold: 0.05,
            start_threshold: 0.5,
            acceptance_threshold: 0.3,
            calibration_ms: 1000,
            analysis_ms: 5000,
            min_frames: 5,
            video_ready_retries: 20,
            video_ready_interval_ms: 200,
            max_consecutive_failures: 10,
        }
    }
}

impl SamplerConfig {
    /// Stricter config (cleaner frames, more of them)
    pub fn strict() -> Self {
        Self {
            start_threshold: 0.7,
            acceptance_threshold: 0.5,
            min_frames: 15,
            ..Default::default()
        }
    }

    /// Lenient config for poor lighting or low-end webcams
    pub fn lenient() -> Self {
        Self {
            start_threshold: 0.35,
            acceptance_threshold: 0.2,
            analysis_ms: 8000,
            ..Default::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn calibration(&self) -> Duration {
        Duration::from_millis(self.calibration_ms)
    }

    /// Time from analysis start until the window closes
    pub fn total_window(&self) -> Duration {
        Duration::from_millis(self.calibration_ms + self.analysis_ms)
    }

    pub fn video_ready_interval(&self) -> Duration {
        Duration::from_millis(self.video_ready_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_ordered() {
        let c = SamplerConfig::default();
        assert!(c.display_threshold < c.acceptance_threshold);
        assert!(c.acceptance_threshold < c.start_threshold);
        assert_eq!(c.total_window(), Duration::from_millis(6000));
        assert_eq!(c.poll_interval(), Duration::from_millis(150));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let c: SamplerConfig = serde_json::from_str(r#"{"min_frames": 8}"#).unwrap();
        assert_eq!(c.min_frames, 8);
        assert_eq!(c.poll_interval_ms, 150);
    }
}
