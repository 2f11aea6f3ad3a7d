//! Synthetic camera backend for demos and tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::{CameraBackend, CameraError, CaptureConstraints, Resolution, VideoFrame, VideoTrack};

/// Camera that produces flat grey frames at a fixed resolution
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    resolution: Resolution,
    warmup_frames: u32,
    disconnect_after: Option<u32>,
    available: bool,
    opens: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl SyntheticCamera {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            warmup_frames: 0,
            disconnect_after: None,
            available: true,
            opens: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report 0x0 frames for the first `n` reads
    pub fn with_warmup_frames(mut self, n: u32) -> Self {
        self.warmup_frames = n;
        self
    }

    /// Simulate the device vanishing after `n` frames
    pub fn disconnect_after(mut self, n: u32) -> Self {
        self.disconnect_after = Some(n);
        self
    }

    /// A machine with no camera attached
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Resolution::default())
        }
    }

    /// Number of tracks opened so far
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of times a track was stopped
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new(Resolution::new(640, 480))
    }
}

impl CameraBackend for SyntheticCamera {
    fn open(&self, constraints: &CaptureConstraints) -> Result<Box<dyn VideoTrack>, CameraError> {
        if !self.available {
            return Err(CameraError::DeviceUnavailable("no camera found".into()));
        }
        if !self.resolution.satisfies(&constraints.min) {
            return Err(CameraError::ConstraintsNotSatisfiable(format!(
                "device maximum {} below minimum {}",
                self.resolution, constraints.min
            )));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(SyntheticTrack {
            resolution: self.resolution,
            warmup_frames: self.warmup_frames,
            disconnect_after: self.disconnect_after,
            sequence: 0,
            stops: Arc::clone(&self.stops),
        }))
    }
}

struct SyntheticTrack {
    resolution: Resolution,
    warmup_frames: u32,
    disconnect_after: Option<u32>,
    sequence: u32,
    stops: Arc<AtomicUsize>,
}

impl VideoTrack for SyntheticTrack {
    fn resolution(&self) -> Resolution {
        if self.sequence < self.warmup_frames {
            Resolution::default()
        } else {
            self.resolution
        }
    }

    fn latest_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let sequence = self.sequence;
        self.sequence = self.sequence.saturating_add(1);

        if let Some(limit) = self.disconnect_after {
            if sequence >= limit {
                return Err(CameraError::Disconnected("synthetic device removed".into()));
            }
        }
        if sequence < self.warmup_frames {
            return Ok(Some(VideoFrame::new(Vec::new(), 0, 0, 0, sequence)));
        }

        let mut frame = VideoFrame::solid(self.resolution.width, self.resolution.height, [128, 128, 128], sequence);
        frame.timestamp_ns = u64::from(sequence) * 33_333_333;
        Ok(Some(frame))
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Camera;

    #[test]
    fn test_warmup_then_frames() {
        let backend = SyntheticCamera::new(Resolution::new(32, 24)).with_warmup_frames(2);
        let cam = Camera::new(backend.clone());
        let mut session = cam.acquire(&CaptureConstraints {
            min: Resolution::new(16, 16),
            ..Default::default()
        })
        .unwrap();

        assert!(!session.frame().unwrap().unwrap().has_dimensions());
        assert!(!session.frame().unwrap().unwrap().has_dimensions());
        assert!(session.frame().unwrap().unwrap().has_dimensions());

        drop(session);
        assert_eq!(backend.open_count(), 1);
        assert_eq!(backend.stop_count(), 1);
    }

    #[test]
    fn test_disconnect() {
        let backend = SyntheticCamera::default().disconnect_after(1);
        let cam = Camera::new(backend);
        let mut session = cam.acquire(&CaptureConstraints::default()).unwrap();
        assert!(session.frame().is_ok());
        assert!(matches!(session.frame(), Err(CameraError::Disconnected(_))));
    }

    #[test]
    fn test_unavailable() {
        let cam = Camera::new(SyntheticCamera::unavailable());
        assert!(matches!(
            cam.acquire(&CaptureConstraints::default()),
            Err(CameraError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn test_too_small_for_constraints() {
        let cam = Camera::new(SyntheticCamera::new(Resolution::new(160, 120)));
        assert!(matches!(
            cam.acquire(&CaptureConstraints::default()),
            Err(CameraError::ConstraintsNotSatisfiable(_))
        ));
    }
}
