// Session helpers - Blocking glue shared by the operation interactors

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::{ProgressGate, ProgressMonitor};
use crate::ports::*;
use crate::utils::PathUtils;

/// Probe on the runtime and block this worker thread until the single result arrives
pub fn probe_blocking(probe: &Arc<dyn ProbePort>, source: &Path) -> Result<MediaInfo, DomainError> {
    let handle = tokio::runtime::Handle::try_current()
        .map_err(|e| DomainError::Probe(format!("Failed to retrieve video metadata: {}", e)))?;
    let (done, result) = oneshot::channel();

    let probe = Arc::clone(probe);
    let source = source.to_path_buf();
    handle.spawn(async move {
        let _ = done.send(probe.probe(&source).await);
    });

    result.blocking_recv().map_err(|_| {
        DomainError::Probe("Failed to retrieve video metadata: probe was dropped".to_string())
    })?
}

/// Launch `job` and forward its progress through `gate` until the encoder exits
pub fn drive_encoder(
    encoder: &dyn EncoderPort,
    job: EncodeJob,
    monitor: &ProgressMonitor,
    gate: &ProgressGate,
) -> EncoderExit {
    let (events, mut received) = mpsc::unbounded_channel();
    if let Err(err) = encoder.launch(job, events) {
        return EncoderExit::Failed(err.to_string());
    }

    while let Some(event) = received.blocking_recv() {
        if let EncoderEvent::Exit(exit) = event {
            return exit;
        }
        if let Some(percent) = monitor.percent_for(&event) {
            gate.progress(percent);
        }
    }
    EncoderExit::Failed("Encoder stopped without reporting an outcome".to_string())
}

/// Terminal outcome for an encoder exit; success must leave a non-empty `output`
pub fn outcome_for_exit(exit: EncoderExit, output: &Path, missing_message: &str) -> TerminalOutcome {
    match exit {
        EncoderExit::Success if PathUtils::new().is_non_empty_file(output) => {
            TerminalOutcome::Completed {
                output_path: output.to_path_buf(),
            }
        }
        EncoderExit::Success => {
            warn!(output = %output.display(), "Encoder succeeded without output");
            TerminalOutcome::failed(missing_message)
        }
        EncoderExit::Canceled => TerminalOutcome::Canceled,
        EncoderExit::Failed(message) => TerminalOutcome::failed(message),
    }
}

/// Best-effort delete of an intermediate file
pub fn remove_temporary(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed temporary file"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "Could not remove temporary file"),
    }
}
