//! Dashboard Configuration Module
//! Optional JSON overrides for the data path, grid layout and export size.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory at startup.
pub const CONFIG_FILE: &str = "dashboard.json";

/// Fixed relative path of the source dataset.
pub const DEFAULT_DATA_PATH: &str = "data/students_byregion_for_analysis.csv";

/// Exported PNG side length limits, in pixels.
pub const MIN_EXPORT_SIDE: u32 = 200;
pub const MAX_EXPORT_SIDE: u32 = 8000;

/// Smallest grid that still fits a header and one row.
pub const MIN_GRID_HEIGHT: f32 = 40.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {file}: {source}")]
    Io {
        file: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config {file}: {source}")]
    Parse {
        file: String,
        source: serde_json::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Runtime settings. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    /// Visible height of the data grid in points.
    pub grid_height: f32,
    pub page_size: usize,
    pub histogram_bins: usize,
    pub export_width: u32,
    pub export_height: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            grid_height: 300.0,
            page_size: 100,
            histogram_bins: 20,
            export_width: 1200,
            export_height: 700,
        }
    }
}

impl DashboardConfig {
    /// Parse and validate a config from JSON text.
    pub fn from_json(content: &str, source_name: &str) -> Result<Self, ConfigError> {
        let config: DashboardConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                file: source_name.to_string(),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            file: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content, &path.display().to_string())
    }

    /// Load the config if the file exists, falling back to defaults otherwise.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No {} found, using defaults", path.display());
            return Self::default();
        }

        match Self::load_from_file(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e}; using defaults");
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".into()));
        }
        if self.histogram_bins == 0 {
            return Err(ConfigError::Invalid(
                "histogram_bins must be at least 1".into(),
            ));
        }
        let export_sides = MIN_EXPORT_SIDE..=MAX_EXPORT_SIDE;
        if !export_sides.contains(&self.export_width) || !export_sides.contains(&self.export_height)
        {
            return Err(ConfigError::Invalid(format!(
                "export size must be between {MIN_EXPORT_SIDE} and {MAX_EXPORT_SIDE} pixels per side"
            )));
        }
        if self.grid_height < MIN_GRID_HEIGHT {
            return Err(ConfigError::Invalid(format!(
                "grid_height must be at least {MIN_GRID_HEIGHT}"
            )));
        }
        Ok(())
    }
}
