//! # File Discovery
//!
//! Resolves the input path into the list of videos to correct and decides
//! whether the run is a single-file test or a batch over a directory tree.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::NamingConfig;

/// How corrected output is placed next to its source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    /// Single file: write `<stem>_fix.<ext>` beside the untouched original
    Test,
    /// Directory tree: replace every original in place
    Batch,
}

impl OperatingMode {
    pub fn is_test(self) -> bool {
        matches!(self, Self::Test)
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Test => write!(f, "test"),
            Self::Batch => write!(f, "batch"),
        }
    }
}

/// Result of resolving the input path
#[derive(Debug, Clone)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    pub mode: OperatingMode,
}

impl Discovery {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Check whether `path` ends in `.<extension>`, ignoring ASCII case
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Check whether `path` is a batch temporary (`<name><temp_suffix>.<extension>`)
/// left behind by an interrupted run
pub fn is_temporary_output(path: &Path, naming: &NamingConfig) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let suffix = format!("{}.{}", naming.temp_suffix, naming.extension);
    name.len() > suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(&suffix)
}

/// Resolve `input` into the files to correct.
///
/// An existing file with a matching extension is a test run over that file
/// alone. Anything else is walked as a directory root; a root that does not
/// exist simply yields no files. Batch temporaries are never picked up as
/// inputs. Traversal order is whatever the filesystem reports.
pub fn discover<P: AsRef<Path>>(input: P, naming: &NamingConfig) -> Discovery {
    let input = input.as_ref();
    let extension = naming.extension.as_str();

    if input.is_file() && has_extension(input, extension) {
        debug!("Single video input: {:?}", input);
        return Discovery {
            files: vec![input.to_path_buf()],
            mode: OperatingMode::Test,
        };
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input).follow_links(true) {
        match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() || !has_extension(entry.path(), extension) {
                    continue;
                }
                if is_temporary_output(entry.path(), naming) {
                    warn!("Ignoring leftover temporary file {:?}", entry.path());
                    continue;
                }
                files.push(entry.into_path());
            }
            // The root itself missing is an empty batch, not a failure
            Err(e) if e.depth() == 0 => {
                debug!("Input root {:?} not walkable: {}", input, e);
            }
            Err(e) => {
                warn!("Skipping unreadable entry under {:?}: {}", input, e);
            }
        }
    }

    debug!("Found {} candidate files under {:?}", files.len(), input);
    Discovery {
        files,
        mode: OperatingMode::Batch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn naming() -> NamingConfig {
        NamingConfig::default()
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"not really a video").unwrap();
    }

    #[test]
    fn test_single_file_is_test_mode() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        touch(&clip);

        let found = discover(&clip, &naming());
        assert_eq!(found.mode, OperatingMode::Test);
        assert_eq!(found.files, vec![clip]);
    }

    #[test]
    fn test_single_file_extension_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("CLIP.MP4");
        touch(&clip);

        let found = discover(&clip, &naming());
        assert!(found.mode.is_test());
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_directory_is_walked_recursively() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.mp4"));
        touch(&dir.path().join("nested/b.Mp4"));
        touch(&dir.path().join("nested/deeper/c.mp4"));
        touch(&dir.path().join("nested/notes.txt"));
        touch(&dir.path().join("d.mkv"));

        let found = discover(dir.path(), &naming());
        assert_eq!(found.mode, OperatingMode::Batch);

        let mut names: Vec<String> = found
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.mp4", "b.Mp4", "c.mp4"]);
    }

    #[test]
    fn test_missing_directory_is_empty_batch() {
        let dir = tempdir().unwrap();
        let found = discover(dir.path().join("does-not-exist"), &naming());
        assert_eq!(found.mode, OperatingMode::Batch);
        assert!(found.is_empty());
    }

    #[test]
    fn test_non_video_file_is_empty_batch() {
        let dir = tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        touch(&notes);

        let found = discover(&notes, &naming());
        assert_eq!(found.mode, OperatingMode::Batch);
        assert!(found.is_empty());
    }

    #[test]
    fn test_leftover_temporaries_are_not_inputs() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.mp4"));
        touch(&dir.path().join("a.mp4.tmp.mp4"));
        touch(&dir.path().join("nested/b.mp4.TMP.MP4"));

        let found = discover(dir.path(), &naming());
        assert_eq!(found.files, vec![dir.path().join("a.mp4")]);
    }

    #[test]
    fn test_temporary_name_detection() {
        let naming = naming();
        assert!(is_temporary_output(Path::new("clips/a.mp4.tmp.mp4"), &naming));
        assert!(!is_temporary_output(Path::new("clips/a.mp4"), &naming));
        assert!(!is_temporary_output(Path::new("clips/.tmp.mp4"), &naming));
        assert!(!is_temporary_output(Path::new("clips/a_fix.mp4"), &naming));
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempdir().unwrap();
        let found = discover(dir.path(), &naming());
        assert!(found.is_empty());
    }
}
