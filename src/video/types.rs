use std::fmt;

use image::{ImageBuffer, Rgb, RgbImage};

/// Represents a single decoded video frame
///
/// This is a simple wrapper around an interleaved 8-bit, 3-channel image
/// buffer. Channel order is whatever the decoder produced; the corrector
/// flips it with [`Frame::swap_red_blue`].
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| {
            Rgb(color)
        });
        Self { buffer }
    }

    /// Create a frame from tightly packed RGB24 bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data)
            .map(|buffer| Self { buffer })
    }

    /// Get the width of the frame
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Get the height of the frame
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Get a pixel at the given coordinates
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Tightly packed RGB24 bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Reverse the channel axis of every pixel: first and last swap, middle stays.
    ///
    /// Applying this twice restores the original buffer.
    pub fn swap_red_blue(&mut self) {
        for pixel in self.buffer.pixels_mut() {
            pixel.0.swap(0, 2);
        }
    }

    /// Consume the frame, returning a copy with red and blue exchanged
    pub fn into_swapped(mut self) -> Self {
        self.swap_red_blue();
        self
    }
}

/// Geometry and timing of a video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second as numerator / denominator
    pub frame_rate: (i32, i32),
}

impl StreamInfo {
    pub fn fps(&self) -> f64 {
        if self.frame_rate.1 == 0 {
            return 0.0;
        }
        self.frame_rate.0 as f64 / self.frame_rate.1 as f64
    }

    /// Check that a frame matches this stream's geometry
    pub fn matches(&self, frame: &Frame) -> bool {
        frame.width() == self.width && frame.height() == self.height
    }
}

impl fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} @ {:.3} fps", self.width, self.height, self.fps())
    }
}
