// Thumbnail interactor - Single JPEG frame through the CLI encoder

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::app::session::{drive_encoder, outcome_for_exit};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::{CommandBuilder, ProgressGate, ProgressMonitor};
use crate::ports::*;
use crate::utils::PathUtils;

/// Message when no frame could be extracted
pub const THUMBNAIL_FAILED: &str = "Failed to create thumbnail.";

/// Interactor for the thumbnail use case
pub struct ThumbnailInteractor {
    cli_encoder: Arc<dyn EncoderPort>,
    output_dir: PathBuf,
}

impl ThumbnailInteractor {
    pub fn new(cli_encoder: Arc<dyn EncoderPort>, output_dir: PathBuf) -> Self {
        Self {
            cli_encoder,
            output_dir,
        }
    }

    /// Blocking; settles `gate` exactly once
    pub fn execute(&self, options: &TranscodeOptions, gate: &ProgressGate) {
        let outcome = self
            .thumbnail(options, gate)
            .unwrap_or_else(TerminalOutcome::from);
        info!(failed = outcome.is_error(), "Thumbnail finished");
        gate.finish(outcome);
    }

    fn thumbnail(
        &self,
        options: &TranscodeOptions,
        gate: &ProgressGate,
    ) -> Result<TerminalOutcome, DomainError> {
        let paths = PathUtils::new();
        paths.ensure_output_dir(&self.output_dir)?;
        let output = paths
            .output_paths(&self.output_dir, &options.output_base_name)
            .thumbnail;

        let args = CommandBuilder::new().thumbnail_command(
            options.source(),
            &output,
            options.thumbnail_time_secs,
            options.desired,
        );
        let exit = drive_encoder(
            self.cli_encoder.as_ref(),
            EncodeJob::Command {
                args,
                total_duration_secs: 0.0,
            },
            &ProgressMonitor::new(0.0),
            gate,
        );
        Ok(outcome_for_exit(exit, &output, THUMBNAIL_FAILED))
    }
}
