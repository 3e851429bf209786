//! Configuration management for the supervisor directory.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "supervisor-directory";

/// Default records file name.
const RECORDS_FILE_NAME: &str = "supervisors.json";

/// Largest accepted capture resolution multiplier.
pub const MAX_EXPORT_SCALE: f32 = 8.0;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SUPDIR_`)
/// 2. TOML config file at `~/.config/supervisor-directory/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data source configuration.
    pub data: DataConfig,
    /// Page layout configuration.
    pub layout: LayoutConfig,
    /// Badge interaction configuration.
    pub badges: BadgeConfig,
    /// Card export configuration.
    pub export: ExportConfig,
    /// Rasterizer configuration.
    pub raster: RasterConfig,
}

/// Data source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Path to the records file.
    /// Defaults to `~/.local/share/supervisor-directory/supervisors.json`
    pub records_path: Option<PathBuf>,
    /// Path to a palette file. The built-in palette is used when unset.
    pub palette_path: Option<PathBuf>,
    /// Label shown in the directory footer.
    pub last_updated: String,
}

/// Page layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Whether the side panel starts expanded.
    pub side_panel_expanded: bool,
}

/// How a badge click removes the badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalMode {
    /// Remove on click.
    Immediate,
    /// Show a notice and remove after a fixed delay.
    #[default]
    Timed,
}

/// Badge interaction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BadgeConfig {
    /// Removal behaviour.
    pub removal: RemovalMode,
    /// Delay before a timed removal takes effect, in milliseconds.
    pub removal_delay_ms: u64,
}

/// Card export configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory that receives downloaded images.
    /// Defaults to the current directory.
    pub output_dir: Option<PathBuf>,
    /// Resolution multiplier for captures, at most [`MAX_EXPORT_SCALE`].
    pub scale: f32,
    /// Honor cross-origin images during capture.
    pub use_cors: bool,
    /// Capture with a transparent background.
    pub transparent_background: bool,
    /// Replacement for whitespace runs in file names.
    pub file_separator: String,
    /// Suffix appended to file names.
    pub file_suffix: String,
    /// Side panel collapse transition, in milliseconds.
    pub panel_transition_ms: u64,
    /// Time allowed for one rendering cycle, in milliseconds.
    pub bio_render_ms: u64,
    /// How long the failure notice stays visible, in milliseconds.
    pub notice_ms: u64,
}

/// Rasterizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Card width in logical pixels.
    pub card_width: u32,
    /// Hosts that serve images with CORS headers.
    pub cors_hosts: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            records_path: None, // Resolved at runtime
            palette_path: None,
            last_updated: "July 9, 2025".to_string(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            side_panel_expanded: true,
        }
    }
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            removal: RemovalMode::Timed,
            removal_delay_ms: 500,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            scale: 2.0,
            use_cors: true,
            transparent_background: true,
            file_separator: "-".to_string(),
            file_suffix: "-profile.png".to_string(),
            panel_transition_ms: 350,
            bio_render_ms: 100,
            notice_ms: 3000,
        }
    }
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            card_width: 360,
            cors_hosts: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("SUPDIR_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if !self.export.scale.is_finite()
            || self.export.scale <= 0.0
            || self.export.scale > MAX_EXPORT_SCALE
        {
            return Err(Error::ConfigValidation {
                message: format!(
                    "export.scale must be in (0, {MAX_EXPORT_SCALE}], got {}",
                    self.export.scale
                ),
            });
        }

        if self.badges.removal == RemovalMode::Timed && self.badges.removal_delay_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "badges.removal_delay_ms must be greater than 0 in timed mode"
                    .to_string(),
            });
        }

        if !self.export.file_suffix.ends_with(".png") {
            return Err(Error::ConfigValidation {
                message: format!(
                    "export.file_suffix must end with .png, got {}",
                    self.export.file_suffix
                ),
            });
        }

        if self.export.file_separator.chars().any(char::is_whitespace) {
            return Err(Error::ConfigValidation {
                message: "export.file_separator must not contain whitespace".to_string(),
            });
        }

        if self.raster.card_width == 0 {
            return Err(Error::ConfigValidation {
                message: "raster.card_width must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the records path, resolving defaults if not set.
    #[must_use]
    pub fn records_path(&self) -> PathBuf {
        self.data
            .records_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(RECORDS_FILE_NAME))
    }

    /// Get the export output directory, resolving defaults if not set.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.export
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the timed removal delay, or `None` for immediate removal.
    #[must_use]
    pub fn removal_delay(&self) -> Option<Duration> {
        match self.badges.removal {
            RemovalMode::Immediate => None,
            RemovalMode::Timed => Some(Duration::from_millis(self.badges.removal_delay_ms)),
        }
    }

    /// Get the side panel transition as a Duration.
    #[must_use]
    pub fn panel_transition(&self) -> Duration {
        Duration::from_millis(self.export.panel_transition_ms)
    }

    /// Get the rendering cycle as a Duration.
    #[must_use]
    pub fn render_cycle(&self) -> Duration {
        Duration::from_millis(self.export.bio_render_ms)
    }

    /// Get the failure notice lifetime as a Duration.
    #[must_use]
    pub fn notice_lifetime(&self) -> Duration {
        Duration::from_millis(self.export.notice_ms)
    }
}
