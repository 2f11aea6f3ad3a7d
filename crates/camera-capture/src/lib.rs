//! Camera Capture Library
//!
//! Owns the webcam for the duration of an assessment:
//! - Negotiates a user-facing video stream (ideal 640x480 @ 30fps)
//! - Guarantees a single live session per camera
//! - Stops every hardware track when the session is released or dropped

pub mod device;
pub mod frame;
pub mod session;
pub mod synthetic;

pub use device::{CameraBackend, VideoTrack};
pub use frame::VideoFrame;
pub use session::{Camera, CaptureSession};
pub use synthetic::SyntheticCamera;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("No camera mode satisfies the constraints: {0}")]
    ConstraintsNotSatisfiable(String),

    #[error("Camera disconnected: {0}")]
    Disconnected(String),

    #[error("Capture session not acquired")]
    NotAcquired,
}

/// Which way the camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera pointed at the user
    #[default]
    User,
    /// Rear camera
    Environment,
}

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when both dimensions are at least those of `min`
    pub fn satisfies(&self, min: &Resolution) -> bool {
        self.width >= min.width && self.height >= min.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Stream constraints handed to the platform capture API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConstraints {
    /// Preferred resolution
    pub ideal: Resolution,
    /// Smallest acceptable resolution
    pub min: Resolution,
    /// Preferred frame rate
    pub ideal_fps: u32,
    /// Camera orientation
    pub facing: FacingMode,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            ideal: Resolution::new(640, 480),
            min: Resolution::new(320, 240),
            ideal_fps: 30,
            facing: FacingMode::User,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constraints() {
        let c = CaptureConstraints::default();
        assert_eq!(c.ideal, Resolution::new(640, 480));
        assert_eq!(c.min, Resolution::new(320, 240));
        assert_eq!(c.ideal_fps, 30);
        assert_eq!(c.facing, FacingMode::User);
    }

    #[test]
    fn test_resolution_satisfies() {
        let min = Resolution::new(320, 240);
        assert!(Resolution::new(640, 480).satisfies(&min));
        assert!(Resolution::new(320, 240).satisfies(&min));
        assert!(!Resolution::new(320, 200).satisfies(&min));
        assert!(Resolution::new(0, 480).is_empty());
    }
}
