//! Scoped camera acquisition

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{CameraBackend, CameraError, CaptureConstraints, Resolution, VideoFrame, VideoTrack};

/// A camera device that hands out at most one live [`CaptureSession`]
#[derive(Clone)]
pub struct Camera {
    backend: Arc<dyn CameraBackend>,
    in_use: Arc<AtomicBool>,
}

impl Camera {
    /// Wrap a platform backend
    pub fn new<B: CameraBackend + 'static>(backend: B) -> Self {
        Self::from_backend(Arc::new(backend))
    }

    pub fn from_backend(backend: Arc<dyn CameraBackend>) -> Self {
        Self {
            backend,
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a session currently holds the device
    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::SeqCst)
    }

    /// Acquire exclusive access to the camera
    pub fn acquire(&self, constraints: &CaptureConstraints) -> Result<CaptureSession, CameraError> {
        if self
            .in_use
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Camera acquisition refused: device held by another session");
            return Err(CameraError::DeviceUnavailable(
                "camera already held by another session".into(),
            ));
        }

        let mut track = match self.backend.open(constraints) {
            Ok(track) => track,
            Err(e) => {
                self.in_use.store(false, Ordering::SeqCst);
                warn!("Camera open failed: {}", e);
                return Err(e);
            }
        };

        // 0x0 means the platform has not negotiated yet; checked again by the sampler
        let resolution = track.resolution();
        if !resolution.is_empty() && !resolution.satisfies(&constraints.min) {
            track.stop();
            self.in_use.store(false, Ordering::SeqCst);
            return Err(CameraError::ConstraintsNotSatisfiable(format!(
                "negotiated {} below minimum {}",
                resolution, constraints.min
            )));
        }

        info!(
            "Camera acquired ({} requested, {} negotiated, {}fps ideal)",
            constraints.ideal, resolution, constraints.ideal_fps
        );

        Ok(CaptureSession {
            track: Some(track),
            negotiated: resolution,
            in_use: Arc::clone(&self.in_use),
        })
    }
}

/// Live camera stream, released on every exit path
pub struct CaptureSession {
    track: Option<Box<dyn VideoTrack>>,
    negotiated: Resolution,
    in_use: Arc<AtomicBool>,
}

impl CaptureSession {
    /// Current resolution of the stream (last known once released)
    pub fn resolution(&self) -> Resolution {
        match &self.track {
            Some(track) => track.resolution(),
            None => self.negotiated,
        }
    }

    /// Whether the hardware track is still running
    pub fn is_active(&self) -> bool {
        self.track.is_some()
    }

    /// Latest frame from the video surface
    pub fn frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let track = self.track.as_mut().ok_or(CameraError::NotAcquired)?;
        let frame = track.latest_frame()?;
        if let Some(f) = frame.as_ref().filter(|f| f.has_dimensions()) {
            self.negotiated = Resolution::new(f.width, f.height);
        }
        Ok(frame)
    }

    /// Stop all tracks. Calling it again is a no-op.
    pub fn release(&mut self) {
        if let Some(mut track) = self.track.take() {
            track.stop();
            self.in_use.store(false, Ordering::SeqCst);
            info!("Camera released");
        } else {
            debug!("Camera already released");
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct FakeBackend {
        resolution: Resolution,
        stops: Arc<AtomicUsize>,
        fail: Option<CameraError>,
    }

    struct FakeTrack {
        resolution: Resolution,
        stops: Arc<AtomicUsize>,
    }

    impl CameraBackend for FakeBackend {
        fn open(&self, _c: &CaptureConstraints) -> Result<Box<dyn VideoTrack>, CameraError> {
            if let Some(e) = &self.fail {
                return Err(e.clone());
            }
            Ok(Box::new(FakeTrack {
                resolution: self.resolution,
                stops: Arc::clone(&self.stops),
            }))
        }
    }

    impl VideoTrack for FakeTrack {
        fn resolution(&self) -> Resolution {
            self.resolution
        }

        fn latest_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
            Ok(Some(VideoFrame::solid(
                self.resolution.width,
                self.resolution.height,
                [0, 0, 0],
                0,
            )))
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn camera(resolution: Resolution, fail: Option<CameraError>) -> (Camera, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        let cam = Camera::new(FakeBackend {
            resolution,
            stops: Arc::clone(&stops),
            fail,
        });
        (cam, stops)
    }

    #[test]
    fn test_release_is_idempotent() {
        let (cam, stops) = camera(Resolution::new(640, 480), None);
        let mut session = cam.acquire(&CaptureConstraints::default()).unwrap();
        assert!(cam.is_in_use());

        session.release();
        session.release();
        drop(session);

        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(!cam.is_in_use());
    }

    #[test]
    fn test_drop_releases() {
        let (cam, stops) = camera(Resolution::new(640, 480), None);
        {
            let _session = cam.acquire(&CaptureConstraints::default()).unwrap();
        }
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(!cam.is_in_use());
    }

    #[test]
    fn test_single_session_per_camera() {
        let (cam, _) = camera(Resolution::new(640, 480), None);
        let first = cam.acquire(&CaptureConstraints::default()).unwrap();
        let second = cam.acquire(&CaptureConstraints::default());
        assert!(matches!(second, Err(CameraError::DeviceUnavailable(_))));

        drop(first);
        assert!(cam.acquire(&CaptureConstraints::default()).is_ok());
    }

    #[test]
    fn test_resolution_below_minimum() {
        let (cam, stops) = camera(Resolution::new(160, 120), None);
        let result = cam.acquire(&CaptureConstraints::default());
        assert!(matches!(result, Err(CameraError::ConstraintsNotSatisfiable(_))));
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(!cam.is_in_use());
    }

    #[test]
    fn test_open_failure_frees_device() {
        let (cam, _) = camera(
            Resolution::new(640, 480),
            Some(CameraError::DeviceUnavailable("permission denied".into())),
        );
        assert!(cam.acquire(&CaptureConstraints::default()).is_err());
        assert!(!cam.is_in_use());
    }

    #[test]
    fn test_frame_after_release() {
        let (cam, _) = camera(Resolution::new(640, 480), None);
        let mut session = cam.acquire(&CaptureConstraints::default()).unwrap();
        assert!(session.frame().unwrap().is_some());
        session.release();
        assert_eq!(session.frame().unwrap_err(), CameraError::NotAcquired);
        assert_eq!(session.resolution(), Resolution::new(640, 480));
    }
}
