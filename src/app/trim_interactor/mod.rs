// Trim interactor - Lossless copy of the leading part of a source

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::session::{drive_encoder, outcome_for_exit, probe_blocking, remove_temporary};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::TrimPolicy;
use crate::engine::{CommandBuilder, ProgressGate, ProgressMonitor};
use crate::ports::*;
use crate::utils::PathUtils;

/// Message for any trim that leaves no output
pub const TRIM_FAILED: &str = "Failed to trim video.";

/// Interactor for the trim use case
pub struct TrimInteractor {
    probe_port: Arc<dyn ProbePort>,
    cli_encoder: Arc<dyn EncoderPort>,
    segment_port: Arc<dyn SegmentPort>,
    output_dir: PathBuf,
}

impl TrimInteractor {
    /// Create new trim interactor with injected ports
    pub fn new(
        probe_port: Arc<dyn ProbePort>,
        cli_encoder: Arc<dyn EncoderPort>,
        segment_port: Arc<dyn SegmentPort>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            probe_port,
            cli_encoder,
            segment_port,
            output_dir,
        }
    }

    /// Blocking; settles `gate` exactly once
    pub fn execute(&self, options: &TranscodeOptions, gate: &ProgressGate) {
        let outcome = self.trim(options, gate).unwrap_or_else(TerminalOutcome::from);
        info!(failed = outcome.is_error(), "Trim finished");
        gate.finish(outcome);
    }

    fn trim(
        &self,
        options: &TranscodeOptions,
        gate: &ProgressGate,
    ) -> Result<TerminalOutcome, DomainError> {
        let paths = PathUtils::new();
        paths.ensure_output_dir(&self.output_dir)?;
        let output = paths
            .output_paths(&self.output_dir, &options.output_base_name)
            .trimmed;

        let media = probe_blocking(&self.probe_port, options.source())?;
        let effective =
            TrimPolicy::effective_duration(options.requested_duration_secs, media.duration_seconds);

        match options.strategy {
            EncodeStrategy::NativeDemuxRemux => {
                let window = TrimPolicy::leading_window(effective);
                let produced = self
                    .segment_port
                    .extract_segment(options.source(), &output, window, media.rotation_degrees)
                    .unwrap_or_else(|err| {
                        warn!(error = %err, "Segment extraction failed");
                        false
                    });
                if !produced {
                    // The muxer may have created the file before failing
                    remove_temporary(&output);
                    return Ok(TerminalOutcome::failed(TRIM_FAILED));
                }
                Ok(TerminalOutcome::Completed {
                    output_path: output,
                })
            }
            EncodeStrategy::ExternalEncoderCli => {
                let total = TrimPolicy::progress_total(effective, media.duration_seconds);
                let args = CommandBuilder::new().lossless_trim_command(
                    options.source(),
                    &output,
                    0.0,
                    effective,
                );
                let exit = drive_encoder(
                    self.cli_encoder.as_ref(),
                    EncodeJob::Command {
                        args,
                        total_duration_secs: total,
                    },
                    &ProgressMonitor::new(total),
                    gate,
                );
                Ok(outcome_for_exit(exit, &output, TRIM_FAILED))
            }
        }
    }
}
