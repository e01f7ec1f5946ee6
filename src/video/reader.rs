use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;
use ffmpeg::{
    codec,
    decoder,
    format::{self, Pixel},
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::frame::video::Video as FfmpegFrame,
};
use tracing::debug;

use crate::error::{Result, VideoError};
use crate::video::types::{Frame, StreamInfo};

/// Demuxes and decodes the first video stream of a container into RGB24 frames.
///
/// The input container and decoder are released when the reader is dropped.
pub struct VideoReader {
    input: format::context::Input,
    decoder: decoder::Video,
    scaler: Option<ScalingContext>,
    stream_index: usize,
    info: StreamInfo,
    path: PathBuf,
}

impl VideoReader {
    /// Open `path` and prepare a decoder for its best video stream.
    ///
    /// The stream's average frame rate is preferred, then its base rate, then
    /// `fallback_fps`.
    pub fn open<P: AsRef<Path>>(path: P, fallback_fps: u32) -> Result<Self> {
        super::init_ffmpeg()?;

        let path = path.as_ref();
        let open_failed = |e: ffmpeg::Error| VideoError::OpenFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let input = format::input(&path).map_err(open_failed)?;

        let (stream_index, parameters, frame_rate) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or_else(|| VideoError::NoVideoStream {
                    path: path.display().to_string(),
                })?;

            let frame_rate = if stream.avg_frame_rate().numerator() > 0 {
                stream.avg_frame_rate()
            } else if stream.rate().numerator() > 0 {
                stream.rate()
            } else {
                ffmpeg::Rational::new(fallback_fps as i32, 1)
            };

            (stream.index(), stream.parameters(), frame_rate)
        };

        let decoder = codec::context::Context::from_parameters(parameters)
            .and_then(|context| context.decoder().video())
            .map_err(open_failed)?;

        let info = StreamInfo {
            width: decoder.width(),
            height: decoder.height(),
            frame_rate: (frame_rate.numerator(), frame_rate.denominator()),
        };

        debug!("Opened {:?}: stream #{} {}", path, stream_index, info);

        Ok(Self {
            input,
            decoder,
            scaler: None,
            stream_index,
            info,
            path: path.to_path_buf(),
        })
    }

    pub fn info(&self) -> StreamInfo {
        self.info
    }

    /// Decode every frame in order, handing each to `sink` as it comes out of the decoder.
    ///
    /// Returns the number of frames delivered. Stops at the first error from
    /// either the decoder or `sink`.
    pub fn for_each_frame<F>(&mut self, mut sink: F) -> Result<usize>
    where
        F: FnMut(Frame) -> Result<()>,
    {
        let mut delivered = 0;

        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }

            self.decoder.send_packet(&packet).map_err(decoding_failed)?;
            delivered += drain_decoder(&mut self.decoder, &mut self.scaler, self.info, &mut sink)?;
        }

        self.decoder.send_eof().map_err(decoding_failed)?;
        delivered += drain_decoder(&mut self.decoder, &mut self.scaler, self.info, &mut sink)?;

        debug!("Decoded {} frames from {:?}", delivered, self.path);
        Ok(delivered)
    }

    /// Decode the whole stream into memory
    pub fn read_all(&mut self) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        self.for_each_frame(|frame| {
            frames.push(frame);
            Ok(())
        })?;
        Ok(frames)
    }
}

fn decoding_failed(e: ffmpeg::Error) -> VideoError {
    VideoError::DecodingFailed { reason: e.to_string() }
}

/// Pull every frame the decoder has ready, convert it to RGB24, and pass it on.
fn drain_decoder<F>(
    decoder: &mut decoder::Video,
    scaler: &mut Option<ScalingContext>,
    info: StreamInfo,
    sink: &mut F,
) -> Result<usize>
where
    F: FnMut(Frame) -> Result<()>,
{
    let mut decoded = FfmpegFrame::empty();
    let mut count = 0;

    loop {
        match decoder.receive_frame(&mut decoded) {
            Ok(()) => {
                let rgb = convert_to_rgb24(scaler, &decoded, info)?;
                sink(frame_from_rgb24(&rgb)?)?;
                count += 1;
            }
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::ffi::EAGAIN => break,
            Err(ffmpeg::Error::Eof) => break,
            Err(e) => return Err(decoding_failed(e).into()),
        }
    }

    Ok(count)
}

/// Scale `decoded` to RGB24 at the stream's geometry.
///
/// The scaler is built from the first real frame, since some decoders only
/// know their pixel format once data has gone through them, and rebuilt
/// whenever a later frame arrives with a different format or size.
fn convert_to_rgb24(
    scaler: &mut Option<ScalingContext>,
    decoded: &FfmpegFrame,
    info: StreamInfo,
) -> Result<FfmpegFrame> {
    let stale = scaler.as_ref().map_or(true, |current| {
        let input = current.input();
        input.format != decoded.format()
            || input.width != decoded.width()
            || input.height != decoded.height()
    });

    if stale {
        if scaler.is_some() {
            debug!(
                "Decoded frames changed to {}x{} {:?}, rebuilding scaler",
                decoded.width(),
                decoded.height(),
                decoded.format()
            );
        }
        *scaler = Some(
            ScalingContext::get(
                decoded.format(),
                decoded.width(),
                decoded.height(),
                Pixel::RGB24,
                info.width,
                info.height,
                ScalingFlags::BILINEAR,
            )
            .map_err(decoding_failed)?,
        );
    }

    let mut rgb = FfmpegFrame::empty();
    if let Some(scaler) = scaler.as_mut() {
        scaler.run(decoded, &mut rgb).map_err(|e| VideoError::FrameProcessingFailed {
            reason: format!("RGB conversion failed: {}", e),
        })?;
    }
    Ok(rgb)
}

/// Copy a packed RGB24 FFmpeg frame into a tightly packed [`Frame`], dropping row padding.
fn frame_from_rgb24(rgb: &FfmpegFrame) -> Result<Frame> {
    let width = rgb.width();
    let height = rgb.height();
    let row_bytes = width as usize * 3;
    let stride = rgb.stride(0);
    let data = rgb.data(0);

    let mut packed = Vec::with_capacity(row_bytes * height as usize);
    for y in 0..height as usize {
        let start = y * stride;
        packed.extend_from_slice(&data[start..start + row_bytes]);
    }

    Frame::from_rgb_bytes(width, height, packed).ok_or_else(|| {
        VideoError::FrameProcessingFailed {
            reason: format!("decoded frame does not fill {}x{}", width, height),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yuv_frame(width: u32, height: u32, luma: u8) -> FfmpegFrame {
        let mut frame = FfmpegFrame::new(Pixel::YUV420P, width, height);
        for plane in 0..frame.planes() {
            let value = if plane == 0 { luma } else { 128 };
            frame.data_mut(plane).fill(value);
        }
        frame
    }

    #[test]
    fn test_scaler_follows_mid_stream_geometry_change() {
        let info = StreamInfo { width: 32, height: 24, frame_rate: (25, 1) };
        let mut scaler = None;

        let first = convert_to_rgb24(&mut scaler, &yuv_frame(32, 24, 200), info).unwrap();
        let second = convert_to_rgb24(&mut scaler, &yuv_frame(16, 12, 60), info).unwrap();

        for rgb in [&first, &second] {
            let frame = frame_from_rgb24(rgb).unwrap();
            assert_eq!((frame.width(), frame.height()), (32, 24));
        }
        let input = scaler.as_ref().unwrap().input();
        assert_eq!((input.width, input.height), (16, 12));

        let bright = frame_from_rgb24(&first).unwrap().get_pixel(16, 12);
        let dark = frame_from_rgb24(&second).unwrap().get_pixel(16, 12);
        assert!(bright[1] > dark[1] + 80, "bright={:?} dark={:?}", bright, dark);
    }

    #[test]
    fn test_scaler_follows_pixel_format_change() {
        let info = StreamInfo { width: 16, height: 16, frame_rate: (25, 1) };
        let mut scaler = None;

        convert_to_rgb24(&mut scaler, &yuv_frame(16, 16, 128), info).unwrap();

        let mut rgba = FfmpegFrame::new(Pixel::RGBA, 16, 16);
        rgba.data_mut(0).fill(255);
        let rgb = convert_to_rgb24(&mut scaler, &rgba, info).unwrap();

        assert_eq!(scaler.as_ref().unwrap().input().format, Pixel::RGBA);
        assert_eq!(frame_from_rgb24(&rgb).unwrap().get_pixel(8, 8), [255, 255, 255]);
    }
}
