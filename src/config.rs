// ⚙️ Configuration - explicit run settings
// Every field has a default, so a missing config file means "run with defaults".

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file looked up in the working directory by the binary
pub const DEFAULT_CONFIG_FILE: &str = "p3_master.toml";

/// Master file name (created or overwritten on every run)
pub const DEFAULT_OUTPUT_FILE: &str = "P3_MASTER_VERIFIED.csv";

/// Average weeks left for a pregnant registrant (S1)
pub const DEFAULT_REMAINING_WEEKS: i64 = 20;

/// Fake score at or below which a record is usable for Sales
pub const DEFAULT_FAKE_THRESHOLD: u8 = 70;

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

/// Thresholds consumed by the scoring pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Weeks added to the registration date to predict a birth date
    pub remaining_weeks: i64,

    /// Highest fake score that still counts as sales-ready
    pub fake_threshold: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            remaining_weeks: DEFAULT_REMAINING_WEEKS,
            fake_threshold: DEFAULT_FAKE_THRESHOLD,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.remaining_weeks < 0 {
            return Err(PipelineError::Config(format!(
                "remaining_weeks must not be negative (got {})",
                self.remaining_weeks
            )));
        }

        if self.fake_threshold > 100 {
            return Err(PipelineError::Config(format!(
                "fake_threshold must be within 0-100 (got {})",
                self.fake_threshold
            )));
        }

        Ok(())
    }
}

// ============================================================================
// APP CONFIG
// ============================================================================

/// Full run configuration: where to read, where to write, how to score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Folder scanned for CSV extracts
    pub input_folder: PathBuf,

    /// Output artifact name, written inside `input_folder`
    pub output_file: String,

    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            input_folder: PathBuf::from("."),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document; absent keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_file.trim().is_empty() {
            return Err(PipelineError::Config("output_file must not be empty".to_string()));
        }

        self.pipeline.validate()
    }

    /// Absolute-or-relative path of the output artifact
    pub fn output_path(&self) -> PathBuf {
        self.input_folder.join(&self.output_file)
    }
}

// ============================================================================
// TESTS
// ============================================================================
