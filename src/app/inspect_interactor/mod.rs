// Inspect interactor - Media metadata for one file

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;
use crate::utils::format_file_size;

/// Interactor for the info use case
pub struct InspectInteractor {
    probe_port: Arc<dyn ProbePort>,
}

impl InspectInteractor {
    /// Create new inspect interactor with injected ports
    pub fn new(probe_port: Arc<dyn ProbePort>) -> Self {
        Self { probe_port }
    }

    /// Probe `path`; a missing file is a probe error before the prober runs
    pub async fn execute(&self, path: &Path) -> Result<MediaInfo, DomainError> {
        if !path.is_file() {
            return Err(DomainError::Probe(format!(
                "Failed to retrieve video metadata: {} does not exist",
                path.display()
            )));
        }

        let media = self.probe_port.probe(path).await?;
        info!(
            path = %path.display(),
            size = %format_file_size(media.size_bytes),
            dimension = %media.display_dimension(),
            orientation = %media.orientation,
            "Media inspected"
        );
        Ok(media)
    }
}
