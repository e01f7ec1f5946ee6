use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;
use ffmpeg::{
    codec,
    encoder,
    format::{self, Pixel},
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::frame::video::Video as FfmpegFrame,
    Dictionary, Packet, Rational,
};
use tracing::debug;

use crate::config::EncoderConfig;
use crate::error::{Result, VideoError};
use crate::video::types::{Frame, StreamInfo};

/// Encodes RGB24 frames into a single-stream output container.
///
/// Frames are converted to the configured planar pixel format, stamped with
/// consecutive timestamps in a `1/fps` time base, and muxed in the order they
/// are written. Dropping the writer without [`VideoWriter::finish`] closes the
/// file but leaves it without a trailer.
pub struct VideoWriter {
    output: format::context::Output,
    encoder: encoder::Video,
    scaler: ScalingContext,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    info: StreamInfo,
    next_pts: i64,
    path: PathBuf,
}

impl VideoWriter {
    /// Create `path` and open an encoder matching `info`'s geometry and frame rate.
    ///
    /// `threads` caps the encoder's own thread count; 0 lets the codec decide.
    pub fn create<P: AsRef<Path>>(
        path: P,
        info: StreamInfo,
        settings: &EncoderConfig,
        threads: usize,
    ) -> Result<Self> {
        super::init_ffmpeg()?;

        let path = path.as_ref();
        let mut output = format::output(&path).map_err(|e| VideoError::OpenFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let codec = encoder::find_by_name(&settings.codec)
            .or_else(|| encoder::find(codec::Id::H264))
            .ok_or_else(|| VideoError::CodecNotFound {
                codec: settings.codec.clone(),
            })?;

        let pixel_format = pixel_format_from_name(&settings.pixel_format)?;
        let frame_rate = Rational::new(info.frame_rate.0, info.frame_rate.1);
        let encoder_time_base = frame_rate.invert();

        let mut video = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(encoding_failed)?;

        video.set_width(info.width);
        video.set_height(info.height);
        video.set_format(pixel_format);
        video.set_frame_rate(Some(frame_rate));
        video.set_time_base(encoder_time_base);

        if output.format().flags().contains(format::Flags::GLOBAL_HEADER) {
            video.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let mut opts = Dictionary::new();
        opts.set("crf", &settings.crf.to_string());
        opts.set("preset", &settings.preset);
        if threads > 0 {
            opts.set("threads", &threads.to_string());
        }

        debug!(
            "Opening encoder {} ({:?}) for {:?}: {}, crf {}, preset {}, threads {}",
            codec.name(),
            pixel_format,
            path,
            info,
            settings.crf,
            settings.preset,
            threads
        );

        let encoder = video.open_with(opts).map_err(|e| VideoError::EncodingFailed {
            reason: format!("failed to open encoder '{}': {}", codec.name(), e),
        })?;

        let stream_index = {
            let mut stream = output.add_stream(codec).map_err(encoding_failed)?;
            stream.set_parameters(&encoder);
            stream.set_time_base(encoder_time_base);
            stream.index()
        };

        output.write_header().map_err(|e| VideoError::EncodingFailed {
            reason: format!("failed to write header: {}", e),
        })?;

        // The muxer is free to pick its own time base while writing the header
        let stream_time_base = output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| VideoError::EncodingFailed {
                reason: format!("output stream #{} vanished", stream_index),
            })?;

        let scaler = ScalingContext::get(
            Pixel::RGB24,
            info.width,
            info.height,
            pixel_format,
            info.width,
            info.height,
            ScalingFlags::BILINEAR,
        )
        .map_err(encoding_failed)?;

        Ok(Self {
            output,
            encoder,
            scaler,
            stream_index,
            encoder_time_base,
            stream_time_base,
            info,
            next_pts: 0,
            path: path.to_path_buf(),
        })
    }

    /// Number of frames handed to the encoder so far
    pub fn frames_written(&self) -> usize {
        self.next_pts as usize
    }

    /// Encode one frame as the next frame of the stream.
    pub fn write(&mut self, frame: &Frame) -> Result<()> {
        if !self.info.matches(frame) {
            return Err(VideoError::FrameProcessingFailed {
                reason: format!(
                    "frame is {}x{} but the output stream is {}x{}",
                    frame.width(),
                    frame.height(),
                    self.info.width,
                    self.info.height
                ),
            }
            .into());
        }

        let rgb = rgb24_from_frame(frame);
        let mut planar = FfmpegFrame::empty();
        self.scaler
            .run(&rgb, &mut planar)
            .map_err(|e| VideoError::FrameProcessingFailed {
                reason: format!("pixel format conversion failed: {}", e),
            })?;
        planar.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder.send_frame(&planar).map_err(encoding_failed)?;
        self.drain_packets()
    }

    /// Flush the encoder, write the container trailer, and return the frame count.
    pub fn finish(mut self) -> Result<usize> {
        self.encoder.send_eof().map_err(encoding_failed)?;
        self.drain_packets()?;

        self.output.write_trailer().map_err(|e| VideoError::EncodingFailed {
            reason: format!("failed to write trailer: {}", e),
        })?;

        debug!("Finished {:?} with {} frames", self.path, self.next_pts);
        Ok(self.frames_written())
    }

    fn drain_packets(&mut self) -> Result<()> {
        let mut packet = Packet::empty();

        loop {
            match self.encoder.receive_packet(&mut packet) {
                Ok(()) => {
                    packet.set_stream(self.stream_index);
                    packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
                    packet
                        .write_interleaved(&mut self.output)
                        .map_err(|e| VideoError::EncodingFailed {
                            reason: format!("failed to write packet: {}", e),
                        })?;
                }
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::ffi::EAGAIN => break,
                Err(ffmpeg::Error::Eof) => break,
                Err(e) => return Err(encoding_failed(e).into()),
            }
        }

        Ok(())
    }
}

fn encoding_failed(e: ffmpeg::Error) -> VideoError {
    VideoError::EncodingFailed { reason: e.to_string() }
}

fn pixel_format_from_name(name: &str) -> Result<Pixel> {
    match name {
        "yuv420p" => Ok(Pixel::YUV420P),
        "yuv422p" => Ok(Pixel::YUV422P),
        "yuv444p" => Ok(Pixel::YUV444P),
        other => Err(VideoError::Unsupported {
            reason: format!("output pixel format '{}'", other),
        }
        .into()),
    }
}

/// Copy a tightly packed [`Frame`] into an FFmpeg RGB24 frame, honouring its row stride.
fn rgb24_from_frame(frame: &Frame) -> FfmpegFrame {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = width as usize * 3;

    let mut rgb = FfmpegFrame::new(Pixel::RGB24, width, height);
    let stride = rgb.stride(0);
    let src = frame.as_bytes();
    let dst = rgb.data_mut(0);

    for y in 0..height as usize {
        let src_start = y * row_bytes;
        let dst_start = y * stride;
        dst[dst_start..dst_start + row_bytes].copy_from_slice(&src[src_start..src_start + row_bytes]);
    }

    rgb
}
