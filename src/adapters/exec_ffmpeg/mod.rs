//! FFmpeg CLI execution adapter
//!
//! Spawns the external `ffmpeg` binary with a prepared argument vector and turns its
//! stderr into log-line events followed by a single exit event.

use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::ports::*;

/// Exit status FFmpeg reports when it was asked to quit
pub const CANCELED_EXIT_CODE: i32 = 255;

/// Map a process exit code onto an encoder outcome; no code means killed by a signal
pub fn exit_for_status(code: Option<i32>) -> EncoderExit {
    match code {
        Some(0) => EncoderExit::Success,
        Some(CANCELED_EXIT_CODE) | None => EncoderExit::Canceled,
        Some(code) => EncoderExit::Failed(format!("FFmpeg returned with error code: {}", code)),
    }
}

/// External encoder driven through its command line
pub struct FfmpegCliEncoder {
    ffmpeg_path: String,
    global_args: Vec<String>,
}

impl FfmpegCliEncoder {
    /// Create new CLI encoder for the given binary
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            global_args: ["-y", "-nostdin", "-hide_banner"]
                .iter()
                .map(|arg| arg.to_string())
                .collect(),
        }
    }

    /// Replace the arguments placed before every job's own arguments
    pub fn with_global_args(mut self, args: Vec<String>) -> Self {
        self.global_args = args;
        self
    }
}

impl EncoderPort for FfmpegCliEncoder {
    fn launch(
        &self,
        job: EncodeJob,
        events: UnboundedSender<EncoderEvent>,
    ) -> Result<(), DomainError> {
        let EncodeJob::Command { args, .. } = job else {
            return Err(DomainError::BadArgs(
                "CLI encoder needs a command job".to_string(),
            ));
        };
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| DomainError::EncodeFailure(format!("No async runtime: {}", e)))?;

        debug!(binary = %self.ffmpeg_path, args = ?args, "Launching encoder");

        // Process spawning registers with the runtime's reactor
        let _guard = handle.enter();
        let mut child = Command::new(&self.ffmpeg_path)
            .args(&self.global_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DomainError::EncodeFailure(format!("Failed to launch {}: {}", self.ffmpeg_path, e))
            })?;

        let stderr = child.stderr.take();
        handle.spawn(async move {
            if let Some(stderr) = stderr {
                forward_lines(stderr, &events).await;
            }
            let exit = match child.wait().await {
                Ok(status) => exit_for_status(status.code()),
                Err(e) => {
                    warn!(error = %e, "Lost track of encoder process");
                    EncoderExit::Failed(format!("Encoder process failed: {}", e))
                }
            };
            info!(exit = ?exit, "Encoder exited");
            let _ = events.send(EncoderEvent::Exit(exit));
        });

        Ok(())
    }
}

/// Longest line kept before it is forwarded unterminated
pub const MAX_LINE_BYTES: usize = 64 * 1024;

// FFmpeg rewrites its status line with '\r', so both separators end a line.
// Bytes are buffered until a separator so multi-byte characters split across reads survive.
async fn forward_lines<R: AsyncRead + Unpin>(mut reader: R, events: &UnboundedSender<EncoderEvent>) {
    let mut chunk = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let read = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Failed to read encoder output");
                break;
            }
        };
        pending.extend_from_slice(&chunk[..read]);

        loop {
            let line: Vec<u8> = match pending.iter().position(|b| *b == b'\r' || *b == b'\n') {
                Some(end) if end < MAX_LINE_BYTES => pending.drain(..=end).collect(),
                _ if pending.len() >= MAX_LINE_BYTES => pending.drain(..MAX_LINE_BYTES).collect(),
                _ => break,
            };
            send_line(&line, events);
        }
    }
    send_line(&pending, events);
}

fn send_line(line: &[u8], events: &UnboundedSender<EncoderEvent>) {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if !line.is_empty() {
        let _ = events.send(EncoderEvent::LogLine(line.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_for_status(Some(0)), EncoderExit::Success);
        assert_eq!(exit_for_status(Some(255)), EncoderExit::Canceled);
        assert_eq!(exit_for_status(None), EncoderExit::Canceled);
        assert_eq!(
            exit_for_status(Some(1)),
            EncoderExit::Failed("FFmpeg returned with error code: 1".to_string())
        );
    }

    #[tokio::test]
    async fn test_forward_lines_splits_carriage_returns() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let output: &[u8] = b"frame=1 time=00:00:01.00\rframe=2 time=00:00:02.00\r\n\nlast";
        forward_lines(output, &tx).await;
        drop(tx);

        let mut lines = Vec::new();
        while let Some(EncoderEvent::LogLine(line)) = rx.recv().await {
            lines.push(line);
        }
        assert_eq!(
            lines,
            vec!["frame=1 time=00:00:01.00", "frame=2 time=00:00:02.00", "last"]
        );
    }

    async fn collect_lines(rx: &mut mpsc::UnboundedReceiver<EncoderEvent>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(EncoderEvent::LogLine(line)) = rx.recv().await {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_forward_lines_keeps_characters_split_across_reads() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // 'é' is C3 A9; the first read ends between the two bytes
        let first: &[u8] = b"title=caf\xC3";
        let second: &[u8] = b"\xA9 time=00:00:01.00\n";
        forward_lines(first.chain(second), &tx).await;
        drop(tx);

        assert_eq!(collect_lines(&mut rx).await, vec!["title=caf\u{e9} time=00:00:01.00"]);
    }

    #[tokio::test]
    async fn test_forward_lines_caps_unterminated_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut output = vec![b'x'; MAX_LINE_BYTES + 10];
        output.extend_from_slice(b"\nend");
        forward_lines(output.as_slice(), &tx).await;
        drop(tx);

        let lines = collect_lines(&mut rx).await;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), MAX_LINE_BYTES);
        assert_eq!(lines[1], "x".repeat(10));
        assert_eq!(lines[2], "end");
    }

    #[test]
    fn test_rejects_structured_jobs() {
        let encoder = FfmpegCliEncoder::new("ffmpeg");
        let (tx, _rx) = mpsc::unbounded_channel();
        let job = EncodeJob::Structured {
            input: "in.mp4".into(),
            output: "out.mp4".into(),
            format: crate::domain::model::FormatStrategy::from_options(
                &crate::domain::model::TranscodeOptions::new("in.mp4", "out"),
            ),
        };
        assert!(matches!(
            encoder.launch(job, tx),
            Err(DomainError::BadArgs(_))
        ));
    }

    #[test]
    fn test_launch_without_runtime_fails() {
        let encoder = FfmpegCliEncoder::new("ffmpeg");
        let (tx, _rx) = mpsc::unbounded_channel();
        let job = EncodeJob::Command {
            args: vec![],
            total_duration_secs: 0.0,
        };
        assert!(matches!(
            encoder.launch(job, tx),
            Err(DomainError::EncodeFailure(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn test_script_exit_code_and_output() {
        let encoder = FfmpegCliEncoder::new("/bin/sh").with_global_args(vec!["-c".to_string()]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let job = EncodeJob::Command {
            args: vec!["printf 'time=00:00:01.00\\n' >&2; exit 3".to_string()],
            total_duration_secs: 2.0,
        };
        encoder.launch(job, tx).unwrap();

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let done = matches!(event, EncoderEvent::Exit(_));
            events.push(event);
            if done {
                break;
            }
        }
        assert_eq!(
            events,
            vec![
                EncoderEvent::LogLine("time=00:00:01.00".to_string()),
                EncoderEvent::Exit(EncoderExit::Failed(
                    "FFmpeg returned with error code: 3".to_string()
                )),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_launch() {
        let encoder = FfmpegCliEncoder::new("/nonexistent/ffmpeg-binary");
        let (tx, _rx) = mpsc::unbounded_channel();
        let job = EncodeJob::Command {
            args: vec![],
            total_duration_secs: 0.0,
        };
        assert!(matches!(
            encoder.launch(job, tx),
            Err(DomainError::EncodeFailure(_))
        ));
    }
}
