//! tract backend for the face detector and expression classifier

use async_trait::async_trait;
use camera_capture::VideoFrame;
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::detector::{ExpressionModel, ModelAssets, ModelLoader};
use crate::emotion::RawDetection;
use crate::DetectionError;

type Plan = TypedRunnableModel<TypedModel>;

/// Square input side of the face detector
const FACE_INPUT: u32 = 416;
/// Square grayscale input side of the expression classifier
const EXPRESSION_INPUT: u32 = 48;
/// Classifier output order
const EXPRESSION_LABELS: [&str; 7] = ["angry", "disgust", "fear", "happy", "sad", "surprise", "neutral"];

/// Face box in source-frame pixels
#[derive(Debug, Clone, Copy, PartialEq)]
struct FaceBox {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    score: f32,
}

/// Loads both networks from `ModelAssets` paths
#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxLoader;

#[async_trait]
impl ModelLoader for OnnxLoader {
    type Model = OnnxExpressionModel;

    async fn load(&self, assets: &ModelAssets) -> Result<OnnxExpressionModel, DetectionError> {
        let face_path = assets.face_detector_uri();
        let expression_path = assets.expression_net_uri();

        tokio::task::spawn_blocking(move || OnnxExpressionModel::from_paths(&face_path, &expression_path))
            .await
            .map_err(|e| DetectionError::ModelUnusable(format!("model loader aborted: {}", e)))?
    }
}

pub struct OnnxExpressionModel {
    face: Plan,
    expression: Plan,
}

impl OnnxExpressionModel {
    pub fn from_paths(face_path: &str, expression_path: &str) -> Result<Self, DetectionError> {
        info!("Loading face detector from {}", face_path);
        let face = load_plan(face_path, 3, FACE_INPUT)?;
        info!("Loading expression classifier from {}", expression_path);
        let expression = load_plan(expression_path, 1, EXPRESSION_INPUT)?;
        Ok(Self { face, expression })
    }

    fn detect_face(&self, frame: &VideoFrame) -> Result<Option<FaceBox>, DetectionError> {
        let resized = frame
            .resize(FACE_INPUT, FACE_INPUT)
            .ok_or_else(|| DetectionError::Inference("frame buffer does not match its dimensions".into()))?;

        let side = FACE_INPUT as usize;
        let pixels = &resized.data;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
            pixels[(y * side + x) * 3 + channel] as f32 / 255.0
        });

        let outputs = self
            .face
            .run(tvec!(input.into_tensor().into()))
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let boxes = outputs
            .first()
            .ok_or_else(|| DetectionError::InvalidOutput("face detector produced no outputs".into()))?
            .to_array_view::<f32>()
            .map_err(|e| DetectionError::InvalidOutput(e.to_string()))?;

        // [1, N, 5]: x1, y1, x2, y2, score, normalized to the input
        let shape = boxes.shape();
        if shape.len() != 3 || shape[2] != 5 {
            return Err(DetectionError::InvalidOutput(format!("unexpected face output shape {:?}", shape)));
        }

        let mut best: Option<FaceBox> = None;
        for i in 0..shape[1] {
            let score = boxes[[0, i, 4]];
            if !score.is_finite() || best.map_or(false, |b| b.score >= score) {
                continue;
            }
            let x1 = boxes[[0, i, 0]].clamp(0.0, 1.0);
            let y1 = boxes[[0, i, 1]].clamp(0.0, 1.0);
            let x2 = boxes[[0, i, 2]].clamp(0.0, 1.0);
            let y2 = boxes[[0, i, 3]].clamp(0.0, 1.0);

            let x = (x1 * frame.width as f32) as u32;
            let y = (y1 * frame.height as f32) as u32;
            let width = ((x2 - x1) * frame.width as f32) as u32;
            let height = ((y2 - y1) * frame.height as f32) as u32;
            if width == 0 || height == 0 {
                continue;
            }
            best = Some(FaceBox { x, y, width, height, score });
        }

        Ok(best)
    }

    fn classify(&self, frame: &VideoFrame, face: &FaceBox) -> Result<Vec<f32>, DetectionError> {
        let gray = frame
            .crop(face.x, face.y, face.width, face.height)
            .and_then(|f| f.to_grayscale())
            .ok_or_else(|| DetectionError::Inference("face crop outside frame".into()))?;
        let gray = imageops::resize(&gray, EXPRESSION_INPUT, EXPRESSION_INPUT, FilterType::Triangle);

        let side = EXPRESSION_INPUT as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 1, side, side), |(_, _, y, x)| {
            gray.get_pixel(x as u32, y as u32)[0] as f32 / 255.0
        });

        let outputs = self
            .expression
            .run(tvec!(input.into_tensor().into()))
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let logits: Vec<f32> = outputs
            .first()
            .ok_or_else(|| DetectionError::InvalidOutput("expression net produced no outputs".into()))?
            .to_array_view::<f32>()
            .map_err(|e| DetectionError::InvalidOutput(e.to_string()))?
            .iter()
            .copied()
            .collect();

        if logits.len() != EXPRESSION_LABELS.len() {
            return Err(DetectionError::InvalidOutput(format!(
                "expected {} expression scores, got {}",
                EXPRESSION_LABELS.len(),
                logits.len()
            )));
        }
        Ok(softmax(&logits))
    }
}

#[async_trait]
impl ExpressionModel for OnnxExpressionModel {
    async fn detect(&self, frame: &VideoFrame) -> Result<Option<RawDetection>, DetectionError> {
        let Some(face) = self.detect_face(frame)? else {
            return Ok(None);
        };
        debug!(
            "Face at ({}, {}) {}x{} score {:.2}",
            face.x, face.y, face.width, face.height, face.score
        );

        let probabilities = self.classify(frame, &face)?;
        let detection = EXPRESSION_LABELS
            .iter()
            .zip(probabilities)
            .fold(RawDetection::new(face.score), |d, (label, p)| d.with(label, p));

        Ok(Some(detection))
    }
}

fn load_plan(path: &str, channels: usize, side: u32) -> Result<Plan, DetectionError> {
    let side = side as usize;
    tract_onnx::onnx()
        .model_for_path(path)
        .and_then(|model| {
            model.with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(1, channels, side, side)))
        })
        .and_then(|model| model.into_optimized())
        .and_then(|model| model.into_runnable())
        .map_err(|e| DetectionError::ModelUnusable(format!("{}: {}", path, e)))
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_normalizes() {
        let p = softmax(&[1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0]);
        let sum: f32 = p.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn test_labels_parse() {
        for label in EXPRESSION_LABELS {
            assert!(crate::Emotion::from_label(label).is_some(), "{}", label);
        }
    }

    #[tokio::test]
    async fn test_missing_assets_are_unusable() {
        let assets = ModelAssets {
            base_uri: "/nonexistent".into(),
            ..Default::default()
        };
        assert!(matches!(
            OnnxLoader.load(&assets).await,
            Err(DetectionError::ModelUnusable(_))
        ));
    }
}
