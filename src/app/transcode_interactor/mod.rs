// Transcode interactor - Probe, decide, optional pre-trim, encode, settle

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::app::session::{drive_encoder, outcome_for_exit, probe_blocking, remove_temporary};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::engine::{CommandBuilder, ProgressGate, ProgressMonitor, TranscodeCommand};
use crate::ports::*;
use crate::utils::{OutputPaths, PathUtils};

/// Message for an encoder that reported success but left no file behind
pub const OUTPUT_MISSING: &str = "Output missing after transcode";

/// Encoder work decided for one operation
struct EncodePlan {
    job: EncodeJob,
    monitor: ProgressMonitor,
    /// Intermediate to delete once encoding settles
    temporary: Option<PathBuf>,
}

/// Interactor for the transcode use case
pub struct TranscodeInteractor {
    probe_port: Arc<dyn ProbePort>,
    cli_encoder: Arc<dyn EncoderPort>,
    native_encoder: Arc<dyn EncoderPort>,
    segment_port: Arc<dyn SegmentPort>,
    output_dir: PathBuf,
}

impl TranscodeInteractor {
    /// Create new transcode interactor with injected ports
    pub fn new(
        probe_port: Arc<dyn ProbePort>,
        cli_encoder: Arc<dyn EncoderPort>,
        native_encoder: Arc<dyn EncoderPort>,
        segment_port: Arc<dyn SegmentPort>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            probe_port,
            cli_encoder,
            native_encoder,
            segment_port,
            output_dir,
        }
    }

    /// Run the whole operation on the current (worker) thread and settle `gate` exactly once
    pub fn execute(&self, options: &TranscodeOptions, gate: &ProgressGate) {
        let outcome = self
            .transcode(options, gate)
            .unwrap_or_else(TerminalOutcome::from);

        match &outcome {
            TerminalOutcome::Completed { output_path } => {
                info!(output = %output_path.display(), "Transcode completed")
            }
            TerminalOutcome::Canceled => info!("Transcode canceled"),
            TerminalOutcome::Failed { message } => error!(%message, "Transcode failed"),
        }
        gate.finish(outcome);
    }

    fn transcode(
        &self,
        options: &TranscodeOptions,
        gate: &ProgressGate,
    ) -> Result<TerminalOutcome, DomainError> {
        let paths = PathUtils::new();
        paths.ensure_output_dir(&self.output_dir)?;
        let outputs = paths.output_paths(&self.output_dir, &options.output_base_name);

        let media = probe_blocking(&self.probe_port, options.source())?;
        info!(
            source = %options.source().display(),
            size = %media.display_dimension(),
            duration = media.duration_seconds,
            strategy = %options.strategy,
            "Source probed"
        );

        let (encoder, plan) = match options.strategy {
            EncodeStrategy::ExternalEncoderCli => {
                (&self.cli_encoder, Self::plan_cli(options, &media, &outputs))
            }
            EncodeStrategy::NativeDemuxRemux => {
                (&self.native_encoder, self.plan_native(options, &media, &outputs))
            }
        };

        let exit = drive_encoder(encoder.as_ref(), plan.job, &plan.monitor, gate);
        if let Some(temporary) = &plan.temporary {
            remove_temporary(temporary);
        }

        Ok(outcome_for_exit(exit, &outputs.transcoded, OUTPUT_MISSING))
    }

    // The duration bound is folded into the command itself
    fn plan_cli(options: &TranscodeOptions, media: &MediaInfo, outputs: &OutputPaths) -> EncodePlan {
        let display = media.display_dimension();
        let resolution = DimensionCalculator::compute_output_dimension(
            display.width,
            display.height,
            options.desired.width,
            options.desired.height,
        );
        let effective =
            TrimPolicy::effective_duration(options.requested_duration_secs, media.duration_seconds);
        let total = TrimPolicy::progress_total(effective, media.duration_seconds);

        let args = CommandBuilder::new().transcode_command(&TranscodeCommand {
            source: options.source(),
            output: &outputs.transcoded,
            duration_secs: options.requested_duration_secs,
            default_duration_secs: media.duration_seconds,
            video_bitrate_kbps: options.video_bitrate_kbps,
            resolution,
        });

        EncodePlan {
            job: EncodeJob::Command {
                args,
                total_duration_secs: total,
            },
            monitor: ProgressMonitor::new(total),
            temporary: None,
        }
    }

    fn plan_native(
        &self,
        options: &TranscodeOptions,
        media: &MediaInfo,
        outputs: &OutputPaths,
    ) -> EncodePlan {
        let mut input = options.source().to_path_buf();
        let mut temporary = None;

        if TrimPolicy::needs_pre_trim(options, media) {
            let effective = TrimPolicy::effective_duration(
                options.requested_duration_secs,
                media.duration_seconds,
            );
            let window = TrimPolicy::leading_window(effective);
            // A failed pre-trim degrades to encoding the whole source
            match self.segment_port.extract_segment(
                options.source(),
                &outputs.pre_trim,
                window,
                media.rotation_degrees,
            ) {
                Ok(true) => input = outputs.pre_trim.clone(),
                Ok(false) => warn!(
                    source = %options.source().display(),
                    "Pre-trim produced no output, encoding the full source"
                ),
                Err(err) => warn!(
                    source = %options.source().display(),
                    error = %err,
                    "Pre-trim failed, encoding the full source"
                ),
            }
            temporary = Some(outputs.pre_trim.clone());
        }

        EncodePlan {
            job: EncodeJob::Structured {
                input,
                output: outputs.transcoded.clone(),
                format: FormatStrategy::from_options(options),
            },
            monitor: ProgressMonitor::new(0.0),
            temporary,
        }
    }
}
