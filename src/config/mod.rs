//! Configuration types for the multi-view pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for rendered frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Frame width in pixels
    #[serde(default = "default_render_width")]
    pub width: u32,

    /// Frame height in pixels
    #[serde(default = "default_render_height")]
    pub height: u32,

    /// Image file extension, e.g. `jpeg` or `png`
    #[serde(default = "default_image_ext")]
    pub image_ext: String,
}

fn default_render_width() -> u32 {
    800
}

fn default_render_height() -> u32 {
    800
}

fn default_image_ext() -> String {
    "jpeg".to_string()
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_render_width(),
            height: default_render_height(),
            image_ext: default_image_ext(),
        }
    }
}

/// Main pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory scanned for STEP model files
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Directory receiving one sub-directory of frames per model
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory receiving run logs and the manifest
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Number of orbit views captured per model
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,

    /// Re-render models whose output already exists
    #[serde(default)]
    pub force_reprocess: bool,

    /// Render backends to try, in order
    #[serde(default = "default_backend_variants")]
    pub backend_variants: Vec<String>,

    /// Process at most this many models, for smoke runs
    #[serde(default)]
    pub limit: Option<usize>,

    #[serde(default)]
    pub render: RenderOptions,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("views")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_sample_count() -> usize {
    36
}

fn default_backend_variants() -> Vec<String> {
    vec!["chart".to_string(), "raster".to_string()]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            log_dir: default_log_dir(),
            sample_count: default_sample_count(),
            force_reprocess: false,
            backend_variants: default_backend_variants(),
            limit: None,
            render: RenderOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create the output and log directories if they don't exist.
    pub fn create_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}
