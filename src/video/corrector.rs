//! Per-file red/blue correction: decode, swap channels, re-encode, and place the result.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{Config, NamingConfig};
use crate::discovery::OperatingMode;
use crate::error::{Result, VideoError};
use crate::video::types::StreamInfo;

/// What a successful correction produced
#[derive(Debug, Clone)]
pub struct FixReport {
    /// The source file that was corrected
    pub path: PathBuf,
    /// Where the corrected video ended up (the source path itself in batch mode)
    pub output: PathBuf,
    pub frames: usize,
    pub stream: StreamInfo,
}

impl FixReport {
    pub fn message(&self) -> String {
        format!("Fixed {}", self.path.display())
    }
}

/// Compute where the corrected video for `path` is written.
///
/// Test mode writes `<stem><fix_suffix>.<ext>` next to the source. Batch mode
/// writes `<file name><temp_suffix>.<extension>`, which is later renamed over
/// the source.
pub fn output_path_for(path: &Path, mode: OperatingMode, naming: &NamingConfig) -> PathBuf {
    let name = match mode {
        OperatingMode::Test => {
            let mut name = path.file_stem().unwrap_or_default().to_os_string();
            name.push(&naming.fix_suffix);
            name.push(".");
            match path.extension() {
                Some(ext) => name.push(ext),
                None => name.push(&naming.extension),
            }
            name
        }
        OperatingMode::Batch => {
            let mut name = path.file_name().map(OsString::from).unwrap_or_default();
            name.push(&naming.temp_suffix);
            name.push(".");
            name.push(&naming.extension);
            name
        }
    };

    path.with_file_name(name)
}

/// Owns a partially written output file and deletes it on drop unless it is
/// kept or committed.
#[derive(Debug)]
pub struct OutputGuard {
    path: PathBuf,
    armed: bool,
}

impl OutputGuard {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leave the file where it is
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }

    /// Atomically move the file over `destination`.
    ///
    /// On failure the guard stays armed, so the temporary file is removed and
    /// `destination` is left as it was.
    pub fn commit_to(mut self, destination: &Path) -> Result<()> {
        std::fs::rename(&self.path, destination).map_err(|e| VideoError::ReplaceFailed {
            path: destination.display().to_string(),
            reason: e.to_string(),
        })?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed partial output {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove partial output {:?}: {}", self.path, e),
        }
    }
}

/// Correct one video file.
///
/// Every frame is decoded, has its first and last channels exchanged, and is
/// re-encoded in the same position. In test mode the result is left beside
/// the source; in batch mode it replaces the source. Any failure removes the
/// partial output and leaves the source untouched.
pub fn fix_video(
    path: &Path,
    mode: OperatingMode,
    config: &Config,
    encoder_threads: usize,
) -> Result<FixReport> {
    let output = output_path_for(path, mode, &config.naming);
    info!("Correcting {:?} ({} mode) via {:?}", path, mode, output);

    let guard = OutputGuard::new(&output);
    let (frames, stream) = transcode(path, guard.path(), config, encoder_threads)?;

    let output = match mode {
        OperatingMode::Test => guard.keep(),
        OperatingMode::Batch => {
            guard.commit_to(path)?;
            path.to_path_buf()
        }
    };

    info!("Corrected {:?}: {} frames, {}", path, frames, stream);
    Ok(FixReport {
        path: path.to_path_buf(),
        output,
        frames,
        stream,
    })
}

/// Decode `source`, swap every frame, and encode into `destination`.
///
/// Both containers are closed before this returns, on success and on error.
#[cfg(feature = "ffmpeg")]
fn transcode(
    source: &Path,
    destination: &Path,
    config: &Config,
    encoder_threads: usize,
) -> Result<(usize, StreamInfo)> {
    use crate::video::{VideoReader, VideoWriter};

    let mut reader = VideoReader::open(source, config.encoder.fallback_fps)?;
    let stream = reader.info();
    let mut writer = VideoWriter::create(destination, stream, &config.encoder, encoder_threads)?;

    reader.for_each_frame(|frame| writer.write(&frame.into_swapped()))?;
    let frames = writer.finish()?;

    Ok((frames, stream))
}

#[cfg(not(feature = "ffmpeg"))]
fn transcode(
    _source: &Path,
    _destination: &Path,
    _config: &Config,
    _encoder_threads: usize,
) -> Result<(usize, StreamInfo)> {
    Err(VideoError::Unsupported {
        reason: "bgr-fixer was built without the `ffmpeg` feature".to_string(),
    }
    .into())
}


#[cfg(all(test, feature = "ffmpeg"))]
mod end_to_end {
    use super::*;
    use crate::video::test_clips::{self, FRAMES, HEIGHT, WIDTH};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_test_mode_writes_sibling_and_keeps_original() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        test_clips::write_swapped_clip(&clip);
        let before = fs::read(&clip).unwrap();

        let report = fix_video(&clip, OperatingMode::Test, &Config::default(), 1).unwrap();

        let fixed = dir.path().join("clip_fix.mp4");
        assert_eq!(report.output, fixed);
        assert_eq!(report.frames, FRAMES);
        assert_eq!(report.message(), format!("Fixed {}", clip.display()));
        assert_eq!(fs::read(&clip).unwrap(), before);

        let (info, frames) = test_clips::read_frames(&fixed);
        assert_eq!((info.width, info.height), (WIDTH, HEIGHT));
        test_clips::assert_corrected(&frames);
    }

    #[test]
    fn test_batch_mode_replaces_original_without_leftovers() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        test_clips::write_swapped_clip(&clip);

        let config = Config::default();
        let report = fix_video(&clip, OperatingMode::Batch, &config, 1).unwrap();

        assert_eq!(report.output, clip);
        assert!(!output_path_for(&clip, OperatingMode::Batch, &config.naming).exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        let (info, frames) = test_clips::read_frames(&clip);
        assert_eq!((info.width, info.height), (WIDTH, HEIGHT));
        assert!((info.fps() - test_clips::FPS as f64).abs() < 0.5);
        test_clips::assert_corrected(&frames);
    }

    #[test]
    fn test_source_clip_is_stored_reversed() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        test_clips::write_swapped_clip(&clip);

        let (_, frames) = test_clips::read_frames(&clip);
        test_clips::assert_still_swapped(&frames);
    }

    #[test]
    fn test_fixing_twice_restores_original_channel_order() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        test_clips::write_swapped_clip(&clip);

        let config = Config::default();
        fix_video(&clip, OperatingMode::Batch, &config, 1).unwrap();
        fix_video(&clip, OperatingMode::Batch, &config, 1).unwrap();

        let (_, frames) = test_clips::read_frames(&clip);
        test_clips::assert_still_swapped(&frames);
    }
}
