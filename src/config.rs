use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
///
/// # Loading
///
/// ```rust,no_run
/// use image_meta_batch::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.output.output_dir = "out".into();
/// config.batch.max_batch_size = 20;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Batch size and per-format write behavior.
    pub batch: BatchConfig,
    /// Where copies, exports and thumbnails go.
    pub output: OutputConfig,
}

/// How existing PNG text chunks are treated when writing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngTextMode {
    /// Drop every existing text chunk and write only Title/Description/Keywords.
    #[default]
    Replace,
    /// Keep unrelated text chunks; only the three keys are rewritten.
    Merge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Inputs beyond this count are ignored.
    pub max_batch_size: usize,
    pub png_text_mode: PngTextMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving edited copies.
    pub output_dir: String,
    /// Directory receiving CSV exports.
    pub export_dir: String,
    /// Longest edge of rendered thumbnails, in pixels.
    pub thumbnail_size: u32,
    /// Optional path to a log file.
    pub log_file: Option<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: crate::pipeline::MAX_BATCH_SIZE,
            png_text_mode: PngTextMode::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: "edited_images".to_string(),
            export_dir: ".".to_string(),
            thumbnail_size: crate::thumbnail::DEFAULT_THUMBNAIL_SIZE,
            log_file: None,
        }
    }
}

impl Config {
    /// Resolve the config file path: `config.json` next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
