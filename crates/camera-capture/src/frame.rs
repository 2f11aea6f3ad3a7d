//! Video frame types and processing

use image::{imageops, GrayImage, RgbImage};

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Frame filled with a single colour
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], sequence: u32) -> Self {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            data.extend_from_slice(&rgb);
        }
        Self::new(data, width, height, 0, sequence)
    }

    /// A frame is usable once the source reports real dimensions and the
    /// buffer matches them.
    pub fn has_dimensions(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == (self.width as usize) * (self.height as usize) * 3
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.data.get(idx..idx + 3).map(|p| [p[0], p[1], p[2]])
    }

    /// View the frame as an `image` buffer; `None` until the frame has dimensions
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if !self.has_dimensions() {
            return None;
        }
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Convert to grayscale
    pub fn to_grayscale(&self) -> Option<GrayImage> {
        self.to_rgb_image().map(|img| imageops::grayscale(&img))
    }

    /// Crop a region of the frame
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Option<VideoFrame> {
        if w == 0 || h == 0 || x + w > self.width || y + h > self.height {
            return None;
        }
        let img = self.to_rgb_image()?;
        let cropped = imageops::crop_imm(&img, x, y, w, h).to_image();

        Some(VideoFrame {
            data: cropped.into_raw(),
            width: w,
            height: h,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        })
    }

    /// Resize frame using bilinear interpolation
    pub fn resize(&self, new_width: u32, new_height: u32) -> Option<VideoFrame> {
        if new_width == 0 || new_height == 0 {
            return None;
        }
        let img = self.to_rgb_image()?;
        let resized = imageops::resize(&img, new_width, new_height, imageops::FilterType::Triangle);

        Some(VideoFrame {
            data: resized.into_raw(),
            width: new_width,
            height: new_height,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_solid_frame() {
        let frame = VideoFrame::solid(4, 2, [10, 20, 30], 7);
        assert!(frame.has_dimensions());
        assert_eq!(frame.get_pixel(3, 1), Some([10, 20, 30]));
        assert_eq!(frame.get_pixel(4, 1), None);
        assert_eq!(frame.sequence, 7);
    }

    #[test]
    fn test_empty_frame_not_ready() {
        let frame = VideoFrame::new(Vec::new(), 0, 0, 0, 0);
        assert!(!frame.has_dimensions());
        assert!(frame.to_rgb_image().is_none());
        assert!(frame.to_grayscale().is_none());
        assert!(frame.resize(48, 48).is_none());
    }

    #[test]
    fn test_short_buffer_not_ready() {
        let frame = VideoFrame::new(vec![0; 5], 2, 2, 0, 0);
        assert!(!frame.has_dimensions());
        assert!(frame.to_rgb_image().is_none());
        assert!(VideoFrame::solid(4, 4, [1, 2, 3], 0).resize(0, 4).is_none());
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let frame = VideoFrame::solid(8, 8, [0, 0, 0], 0);
        assert!(frame.crop(4, 4, 8, 8).is_none());
        let c = frame.crop(2, 2, 4, 3).unwrap();
        assert_eq!((c.width, c.height), (4, 3));
        assert!(c.has_dimensions());
    }

    proptest! {
        #[test]
        fn prop_resize_keeps_buffer_consistent(w in 1u32..32, h in 1u32..32) {
            let frame = VideoFrame::solid(16, 12, [1, 2, 3], 0);
            let r = frame.resize(w, h).unwrap();
            prop_assert!(r.has_dimensions());
            prop_assert_eq!(r.to_grayscale().unwrap().len(), (w * h) as usize);
        }
    }
}
