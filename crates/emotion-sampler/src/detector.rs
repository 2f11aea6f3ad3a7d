//! Face + expression model seam and process-wide model cache

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::emotion::RawDetection;
use crate::{DetectionError, SamplerError};

/// A loaded face detector with an expression classifier on top
#[async_trait]
pub trait ExpressionModel: Send + Sync {
    /// Detect the most prominent face and classify its expression.
    ///
    /// `Ok(None)` means no face in the frame.
    async fn detect(&self, frame: &VideoFrame) -> Result<Option<RawDetection>, DetectionError>;
}

/// Loads model artifacts from their asset location
#[async_trait]
pub trait ModelLoader: Send + Sync {
    type Model: ExpressionModel + 'static;

    async fn load(&self, assets: &ModelAssets) -> Result<Self::Model, DetectionError>;
}

/// Where the pretrained artifacts live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelAssets {
    /// Base URI or directory of the model files
    pub base_uri: String,
    /// Face detector artifact
    pub face_detector: String,
    /// Expression classifier artifact
    pub expression_net: String,
    /// Give up loading after this long (milliseconds)
    pub load_timeout_ms: u64,
}

impl Default for ModelAssets {
    fn default() -> Self {
        Self {
            base_uri: "/models".to_string(),
            face_detector: "tiny_face_detector.onnx".to_string(),
            expression_net: "face_expression.onnx".to_string(),
            load_timeout_ms: 30_000,
        }
    }
}

impl ModelAssets {
    pub fn face_detector_uri(&self) -> String {
        self.join(&self.face_detector)
    }

    pub fn expression_net_uri(&self) -> String {
        self.join(&self.expression_net)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    fn join(&self, file: &str) -> String {
        format!("{}/{}", self.base_uri.trim_end_matches('/'), file)
    }
}

/// Lazily loaded model shared read-only by every sampling session
pub struct SharedModel<L: ModelLoader> {
    loader: L,
    assets: ModelAssets,
    cell: OnceCell<Arc<L::Model>>,
}

impl<L: ModelLoader> SharedModel<L> {
    pub fn new(loader: L, assets: ModelAssets) -> Self {
        Self {
            loader,
            assets,
            cell: OnceCell::new(),
        }
    }

    pub fn assets(&self) -> &ModelAssets {
        &self.assets
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Load on first use; a failed load is retried by the next caller
    pub async fn get(&self) -> Result<Arc<L::Model>, SamplerError> {
        let model = self
            .cell
            .get_or_try_init(|| async {
                info!(
                    "Loading face models from {} ({}, {})",
                    self.assets.base_uri, self.assets.face_detector, self.assets.expression_net
                );
                match tokio::time::timeout(self.assets.load_timeout(), self.loader.load(&self.assets)).await {
                    Ok(Ok(model)) => {
                        info!("Face models loaded");
                        Ok(Arc::new(model))
                    }
                    Ok(Err(e)) => {
                        error!("Failed to load face models: {}", e);
                        Err(SamplerError::ModelUnavailable(e.to_string()))
                    }
                    Err(_) => {
                        error!("Face model loading exceeded {}ms", self.assets.load_timeout_ms);
                        Err(SamplerError::ModelLoadTimeout(self.assets.load_timeout_ms))
                    }
                }
            })
            .await?;

        Ok(Arc::clone(model))
    }
}
