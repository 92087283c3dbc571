//! Application configuration and its precedence rules
//!
//! Values are layered CLI flags > `VIDEOHELPER_*` environment > TOML file > defaults.
//! The file layer is read by `adapters::toml_config`, the CLI layer by `cli::commands`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::EncodeStrategy;

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "VIDEOHELPER_";

/// Logging section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory receiving outputs and temporaries
    pub output_dir: PathBuf,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Concurrent operations; 0 means one per CPU
    pub max_workers: usize,
    pub strategy: EncodeStrategy,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("videos"),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            max_workers: 0,
            strategy: EncodeStrategy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document; keys missing from it keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, DomainError> {
        toml::from_str(content)
            .map_err(|e| DomainError::Config(format!("Failed to parse TOML config: {}", e)))
    }

    /// Effective worker count
    pub fn worker_count(&self) -> usize {
        if self.max_workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.max_workers
        }
    }

    /// Overlay `VIDEOHELPER_*` variables read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<usize, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut applied = 0;

        if let Some(value) = var("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(value);
            applied += 1;
        }
        if let Some(value) = var("FFMPEG_PATH") {
            self.ffmpeg_path = value;
            applied += 1;
        }
        if let Some(value) = var("FFPROBE_PATH") {
            self.ffprobe_path = value;
            applied += 1;
        }
        if let Some(value) = var("MAX_WORKERS") {
            self.max_workers = value.trim().parse().map_err(|e| {
                DomainError::Config(format!("Invalid {}MAX_WORKERS: {}", ENV_PREFIX, e))
            })?;
            applied += 1;
        }
        if let Some(value) = var("STRATEGY") {
            self.strategy = value
                .parse()
                .map_err(|e: DomainError| DomainError::Config(e.to_string()))?;
            applied += 1;
        }
        if let Some(value) = var("LOG_LEVEL") {
            self.logging.level = value;
            applied += 1;
        }
        if let Some(value) = var("LOG_JSON") {
            self.logging.json = matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes");
            applied += 1;
        }

        Ok(applied)
    }

    /// Reject values no operation could run with
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.ffmpeg_path.trim().is_empty() {
            return Err(DomainError::Config("ffmpeg_path cannot be empty".to_string()));
        }
        if self.ffprobe_path.trim().is_empty() {
            return Err(DomainError::Config("ffprobe_path cannot be empty".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(DomainError::Config("output_dir cannot be empty".to_string()));
        }
        Ok(())
    }
}
