//! Stand-in model for runs without model assets

use async_trait::async_trait;
use camera_capture::VideoFrame;
use tracing::warn;

use crate::detector::{ExpressionModel, ModelAssets, ModelLoader};
use crate::emotion::{Emotion, RawDetection};
use crate::DetectionError;

/// Reports the same face and expression on every frame
#[derive(Debug, Clone)]
pub struct SimulatedModel {
    emotion: Emotion,
    confidence: f32,
}

impl SimulatedModel {
    pub fn new(emotion: Emotion, confidence: f32) -> Self {
        Self {
            emotion,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

impl Default for SimulatedModel {
    fn default() -> Self {
        Self::new(Emotion::Neutral, 0.9)
    }
}

#[async_trait]
impl ExpressionModel for SimulatedModel {
    async fn detect(&self, _frame: &VideoFrame) -> Result<Option<RawDetection>, DetectionError> {
        let detection = Emotion::ALL.iter().fold(RawDetection::new(self.confidence), |d, &e| {
            let p = if e == self.emotion { 0.7 } else { 0.05 };
            d.with(e.as_str(), p)
        });
        Ok(Some(detection))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedLoader {
    model: SimulatedModel,
}

impl SimulatedLoader {
    pub fn new(model: SimulatedModel) -> Self {
        Self { model }
    }
}

#[async_trait]
impl ModelLoader for SimulatedLoader {
    type Model = SimulatedModel;

    async fn load(&self, _assets: &ModelAssets) -> Result<SimulatedModel, DetectionError> {
        warn!("No face model configured. Using simulated expression model.");
        Ok(self.model.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::FrameDetection;

    #[tokio::test]
    async fn test_simulated_detection_is_valid() {
        let model = SimulatedModel::new(Emotion::Sad, 0.8);
        let raw = model.detect(&VideoFrame::solid(4, 4, [0, 0, 0], 0)).await.unwrap().unwrap();
        let detection = FrameDetection::try_from(raw).unwrap();

        assert_eq!(detection.probabilities.ranked()[0].0, Emotion::Sad);
        assert!((detection.confidence - 0.8).abs() < 1e-6);
    }
}
