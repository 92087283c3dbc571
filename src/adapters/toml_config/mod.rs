// TOML config adapter - Configuration file discovery and loading

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::AppConfig;
use crate::domain::errors::*;
use crate::ports::*;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "videohelper.toml";

/// TOML configuration adapter
pub struct TomlConfigAdapter {
    search_paths: Vec<PathBuf>,
}

impl TomlConfigAdapter {
    /// Create adapter searching the working directory then the user config directory
    pub fn new() -> Self {
        let mut search_paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = Self::user_config_dir() {
            search_paths.push(dir.join("videohelper").join("config.toml"));
        }
        Self { search_paths }
    }

    /// Create adapter with an explicit search list
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    fn user_config_dir() -> Option<PathBuf> {
        if cfg!(windows) {
            return std::env::var_os("APPDATA").map(PathBuf::from);
        }
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
    }

    /// Read a config file; keys absent from the file keep their defaults
    pub fn read_file(path: &Path) -> Result<AppConfig, DomainError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        AppConfig::from_toml_str(&content)
    }

    /// File layer plus environment overrides, before validation
    pub fn load_with_env<F>(
        &self,
        explicit_path: Option<&Path>,
        lookup: F,
    ) -> Result<AppConfig, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match explicit_path {
            Some(path) => {
                if !path.is_file() {
                    return Err(DomainError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::read_file(path)?
            }
            None => match self.search_paths.iter().find(|p| p.is_file()) {
                Some(path) => {
                    debug!(path = %path.display(), "Using config file");
                    Self::read_file(path)?
                }
                None => AppConfig::default(),
            },
        };

        let overrides = config.apply_env_overrides(lookup)?;
        if overrides > 0 {
            info!(overrides, "Applied environment overrides");
        }
        config.validate()?;
        Ok(config)
    }
}

impl Default for TomlConfigAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigPort for TomlConfigAdapter {
    fn load_config(&self, explicit_path: Option<&Path>) -> Result<AppConfig, DomainError> {
        self.load_with_env(explicit_path, |key| std::env::var(key).ok())
    }
}
