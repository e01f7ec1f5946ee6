//! Synthetic clips for the end-to-end tests.
//!
//! Every frame carries a left half whose colour depends on the frame index and
//! a fixed right half of the opposite dominance, so decoded output can be
//! checked frame by frame and pixel by pixel.

use std::path::Path;

use image::{Rgb, RgbImage};

use crate::config::EncoderConfig;
use crate::video::{Frame, StreamInfo, VideoReader, VideoWriter};

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;
pub const FRAMES: usize = 6;
pub const FPS: i32 = 10;

/// Allowed per-channel drift after a yuv420p round trip
const TOLERANCE: i16 = 20;

/// Per-frame channel value, 40 apart between neighbouring frames
fn ramp(index: usize) -> u8 {
    20 + 40 * index as u8
}

/// True colours of frame `index` as `(left half, right half)`
pub fn true_colors(index: usize) -> ([u8; 3], [u8; 3]) {
    ([220, 30, ramp(index)], [20, 30, 220])
}

fn reversed([r, g, b]: [u8; 3]) -> [u8; 3] {
    [b, g, r]
}

/// Frame `index` as the faulty encode stored it, channels reversed
pub fn swapped_frame(index: usize) -> Frame {
    let (left, right) = true_colors(index);
    let (left, right) = (reversed(left), reversed(right));
    Frame::new(RgbImage::from_fn(WIDTH, HEIGHT, |x, _| {
        if x < WIDTH / 2 {
            Rgb(left)
        } else {
            Rgb(right)
        }
    }))
}

/// Write a clip of [`FRAMES`] blue-first frames to `path`
pub fn write_swapped_clip(path: &Path) {
    let info = StreamInfo { width: WIDTH, height: HEIGHT, frame_rate: (FPS, 1) };
    let mut writer = VideoWriter::create(path, info, &EncoderConfig::default(), 1).unwrap();
    for index in 0..FRAMES {
        writer.write(&swapped_frame(index)).unwrap();
    }
    assert_eq!(writer.finish().unwrap(), FRAMES);
}

pub fn read_frames(path: &Path) -> (StreamInfo, Vec<Frame>) {
    let mut reader = VideoReader::open(path, 30).unwrap();
    let info = reader.info();
    (info, reader.read_all().unwrap())
}

fn assert_close(actual: [u8; 3], expected: [u8; 3], context: &str) {
    let close = actual
        .iter()
        .zip(expected.iter())
        .all(|(&a, &e)| (a as i16 - e as i16).abs() <= TOLERANCE);
    assert!(close, "{}: expected about {:?}, got {:?}", context, expected, actual);
}

/// Check every frame against `expected(index)`, sampling the middle of each half
pub fn assert_frames<F>(frames: &[Frame], expected: F)
where
    F: Fn(usize) -> ([u8; 3], [u8; 3]),
{
    assert_eq!(frames.len(), FRAMES);
    for (index, frame) in frames.iter().enumerate() {
        let (left, right) = expected(index);
        assert_close(frame.get_pixel(WIDTH / 4, HEIGHT / 2), left, &format!("frame {} left", index));
        assert_close(frame.get_pixel(3 * WIDTH / 4, HEIGHT / 2), right, &format!("frame {} right", index));
    }
}

/// Frames hold the true colours, in their original positions
pub fn assert_corrected(frames: &[Frame]) {
    assert_frames(frames, true_colors);
}

/// Frames hold the stored (reversed) colours, in their original positions
pub fn assert_still_swapped(frames: &[Frame]) {
    assert_frames(frames, |index| {
        let (left, right) = true_colors(index);
        (reversed(left), reversed(right))
    });
}
