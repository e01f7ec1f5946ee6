//! # Video Processing Module
//!
//! Decoding, channel correction, and re-encoding of video files.

pub mod types;
pub mod corrector;

#[cfg(feature = "ffmpeg")]
pub mod reader;
#[cfg(feature = "ffmpeg")]
pub mod writer;

#[cfg(all(test, feature = "ffmpeg"))]
pub(crate) mod test_clips;

pub use types::{Frame, StreamInfo};
pub use corrector::{fix_video, output_path_for, FixReport, OutputGuard};

#[cfg(feature = "ffmpeg")]
pub use reader::VideoReader;
#[cfg(feature = "ffmpeg")]
pub use writer::VideoWriter;

#[cfg(feature = "ffmpeg")]
pub(crate) fn init_ffmpeg() -> crate::error::Result<()> {
    use std::sync::OnceLock;

    static INIT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

    INIT.get_or_init(|| {
        ffmpeg_next::init().map_err(|e| e.to_string())?;
        // Keep libav chatter out of the per-file output
        ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);
        Ok(())
    })
    .clone()
    .map_err(|reason| {
        crate::error::VideoError::Unsupported {
            reason: format!("FFmpeg initialisation failed: {}", reason),
        }
        .into()
    })
}
