//! Application Configuration
//!
//! User settings stored in TOML format.

use anyhow::Result;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::capture::{ImageSourceConfig, DEFAULT_MAX_IMAGE_BYTES};
use crate::matcher::MatcherConfig;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Image acquisition settings
    pub scanner: ScannerSettings,
    /// Question matching settings
    pub matcher: MatcherSettings,
    /// Text extraction settings
    pub extraction: ExtractionSettings,
}

/// Image acquisition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// Accepted raster formats, by name ("jpeg", "png", ...)
    pub allowed_formats: Vec<String>,
    /// Maximum accepted image size in bytes
    pub max_image_bytes: usize,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            allowed_formats: vec!["jpeg".to_string(), "png".to_string()],
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

/// Question matching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherSettings {
    /// Minimum confidence (0-100) for a result to be kept
    pub min_confidence: u8,
    /// Maximum number of results returned per attempt
    pub max_results: usize,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        let defaults = MatcherConfig::default();
        Self {
            min_confidence: defaults.min_confidence,
            max_results: defaults.max_results,
        }
    }
}

/// Text extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSettings {
    /// Recognition language (e.g. "eng", "eng+deu")
    pub language: String,
    /// Retry a timed-out extraction once before surfacing the failure
    pub retry_on_timeout: bool,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            retry_on_timeout: true,
        }
    }
}

impl ScannerSettings {
    /// Convert to the acquisition layer's configuration, dropping any format
    /// names it does not recognize.
    pub fn to_image_source_config(&self) -> ImageSourceConfig {
        let mut allowed = Vec::new();
        for name in &self.allowed_formats {
            match parse_format(name) {
                Some(format) => allowed.push(format),
                None => warn!(format = %name, "ignoring unknown image format in config"),
            }
        }
        ImageSourceConfig {
            allowed_formats: allowed,
            max_bytes: self.max_image_bytes,
        }
    }
}

impl MatcherSettings {
    pub fn to_matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            min_confidence: self.min_confidence,
            max_results: self.max_results,
        }
    }
}

fn parse_format(name: &str) -> Option<ImageFormat> {
    match name.to_ascii_lowercase().as_str() {
        "jpeg" | "jpg" => Some(ImageFormat::Jpeg),
        "png" => Some(ImageFormat::Png),
        "webp" => Some(ImageFormat::WebP),
        "bmp" => Some(ImageFormat::Bmp),
        "gif" => Some(ImageFormat::Gif),
        "tiff" | "tif" => Some(ImageFormat::Tiff),
        _ => None,
    }
}

/// Get the per-user configuration directory.
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "quizlens", "QuizLens")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
