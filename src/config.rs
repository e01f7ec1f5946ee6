use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default worker pool size for batch runs
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Main configuration for bgr-fixer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker pool settings
    pub workers: WorkerConfig,

    /// Output encoder settings
    pub encoder: EncoderConfig,

    /// Input matching and output naming
    pub naming: NamingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.workers.validate()?;
        self.encoder.validate()?;
        self.naming.validate()?;
        Ok(())
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of files corrected concurrently in batch mode
    pub max_workers: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl WorkerConfig {
    fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "workers.max_workers".to_string(),
                value: self.max_workers.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Output encoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Encoder name as FFmpeg knows it
    pub codec: String,

    /// Planar output pixel format (yuv420p, yuv422p, yuv444p)
    pub pixel_format: String,

    /// Constant rate factor handed to the encoder (0-51, lower is better)
    pub crf: u8,

    /// Encoder speed preset
    pub preset: String,

    /// Frame rate used when the source stream does not report one
    pub fallback_fps: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            crf: 18,
            preset: "medium".to_string(),
            fallback_fps: 30,
        }
    }
}

const PLANAR_FORMATS: &[&str] = &["yuv420p", "yuv422p", "yuv444p"];

impl EncoderConfig {
    fn validate(&self) -> Result<()> {
        if self.codec.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "encoder.codec".to_string(),
                value: self.codec.clone()
            }.into());
        }

        if !PLANAR_FORMATS.contains(&self.pixel_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "encoder.pixel_format".to_string(),
                value: self.pixel_format.clone()
            }.into());
        }

        if self.crf > 51 {
            return Err(ConfigError::InvalidValue {
                key: "encoder.crf".to_string(),
                value: self.crf.to_string()
            }.into());
        }

        if self.fallback_fps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "encoder.fallback_fps".to_string(),
                value: self.fallback_fps.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Input matching and output naming configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Video extension to match, without the dot (case-insensitive)
    pub extension: String,

    /// Appended to the file stem in test mode
    pub fix_suffix: String,

    /// Appended to the full file name in batch mode
    pub temp_suffix: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            extension: "mp4".to_string(),
            fix_suffix: "_fix".to_string(),
            temp_suffix: ".tmp".to_string(),
        }
    }
}

impl NamingConfig {
    fn validate(&self) -> Result<()> {
        if self.extension.is_empty() || self.extension.contains('.') {
            return Err(ConfigError::InvalidValue {
                key: "naming.extension".to_string(),
                value: self.extension.clone()
            }.into());
        }

        // Empty suffixes would make the output collide with the source
        if self.fix_suffix.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "naming.fix_suffix".to_string(),
                value: self.fix_suffix.clone()
            }.into());
        }

        if self.temp_suffix.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "naming.temp_suffix".to_string(),
                value: self.temp_suffix.clone()
            }.into());
        }

        Ok(())
    }
}
