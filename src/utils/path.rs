//! Path utilities for source decoding and output naming

use std::path::{Path, PathBuf};

use crate::domain::errors::DomainError;

/// Timestamp layout used when the caller supplies no output name
pub const DEFAULT_NAME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Output files produced for one base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Transcoded container, `<base>.mp4`
    pub transcoded: PathBuf,
    /// Temporary pre-trim intermediate, `trim-<base>.mp4`
    pub pre_trim: PathBuf,
    /// Trim operation result, `trimmed-<base>.mp4`
    pub trimmed: PathBuf,
    /// Thumbnail image, `<base>.jpg`
    pub thumbnail: PathBuf,
}

/// Path utilities shared by every operation
pub struct PathUtils;

impl PathUtils {
    /// Create a new path utils instance
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PathUtils {
    fn default() -> Self {
        Self::new()
    }
}

impl PathUtils {
    /// Percent-decode a caller path, then drop a `file://` scheme
    pub fn preprocess_video_path(&self, raw: &str) -> Result<PathBuf, DomainError> {
        let decoded = urlencoding::decode(raw)
            .map_err(|e| DomainError::BadArgs(format!("Invalid video path {}: {}", raw, e)))?;
        let stripped = decoded.strip_prefix("file://").unwrap_or(decoded.as_ref());
        Ok(PathBuf::from(stripped))
    }

    /// Local-time base name for outputs when none was supplied
    pub fn default_base_name(&self) -> String {
        chrono::Local::now().format(DEFAULT_NAME_FORMAT).to_string()
    }

    /// Every output file name for a base name inside `output_dir`
    pub fn output_paths(&self, output_dir: &Path, base_name: &str) -> OutputPaths {
        OutputPaths {
            transcoded: output_dir.join(format!("{}.mp4", base_name)),
            pre_trim: output_dir.join(format!("trim-{}.mp4", base_name)),
            trimmed: output_dir.join(format!("trimmed-{}.mp4", base_name)),
            thumbnail: output_dir.join(format!("{}.jpg", base_name)),
        }
    }

    /// Create the output directory (and parents) if missing
    pub fn ensure_output_dir(&self, output_dir: &Path) -> Result<(), DomainError> {
        if output_dir.is_dir() {
            return Ok(());
        }
        std::fs::create_dir_all(output_dir).map_err(|e| {
            tracing::error!(dir = %output_dir.display(), error = %e, "Output directory unavailable");
            DomainError::Io("Can't access or make videos directory".to_string())
        })
    }

    /// True when the path names a file with at least one byte
    pub fn is_non_empty_file(&self, path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    /// Lower-case extension, if any
    pub fn get_extension(&self, path: &Path) -> Option<String> {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }
}
