//! Platform capture API seam

use crate::{CameraError, CaptureConstraints, Resolution, VideoFrame};

/// A platform media-capture API (V4L2, AVFoundation, a browser bridge, ...)
pub trait CameraBackend: Send + Sync {
    /// Open a video-only stream matching the constraints.
    ///
    /// Implementations return `DeviceUnavailable` when no camera exists or
    /// access is denied, and `ConstraintsNotSatisfiable` when no mode matches.
    fn open(&self, constraints: &CaptureConstraints) -> Result<Box<dyn VideoTrack>, CameraError>;
}

/// A live video track: a continuously updated frame surface
pub trait VideoTrack: Send {
    /// Negotiated resolution. May report 0x0 until the first frame arrives.
    fn resolution(&self) -> Resolution;

    /// Most recent frame, `None` if nothing has been decoded yet.
    ///
    /// Returns `Disconnected` once the device is lost.
    fn latest_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Stop the underlying hardware track
    fn stop(&mut self);
}
