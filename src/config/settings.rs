//! CaptureConfig data structure
//!
//! User settings loaded from a JSON file. Every field is optional in the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Image format used for captured frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpg,
    Png,
    Bmp,
}

impl ImageFormat {
    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Bmp => "bmp",
        }
    }

    /// Matching encoder in the `image` crate
    pub fn encoder_format(&self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Directory captured frames are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Encoding of captured frames
    #[serde(default)]
    pub image_format: ImageFormat,

    /// Playback speed multiplier selected at start-up
    #[serde(default = "default_speed")]
    pub default_speed: f64,

    #[serde(default = "default_window_width")]
    pub window_width: f32,

    #[serde(default = "default_window_height")]
    pub window_height: f32,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("frames")
}

fn default_speed() -> f64 {
    1.0
}

fn default_window_width() -> f32 {
    1000.0
}

fn default_window_height() -> f32 {
    750.0
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            image_format: ImageFormat::default(),
            default_speed: default_speed(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl CaptureConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: CaptureConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}
