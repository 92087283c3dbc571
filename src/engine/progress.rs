//! Encoder progress parsing and terminal-event gating

use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

use crate::domain::model::{OperationEvent, ProgressEvent, TerminalOutcome};
use crate::ports::EncoderEvent;
use crate::utils::time::TimeParser;

// `time=HH:MM:SS` with an optional fraction, as printed on ffmpeg status lines
static TIME_MARKER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"time=(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").ok());

/// Percentage of `total_duration_secs` reached by a log line, if it carries a timestamp.
///
/// The result is not clamped; encoder estimates can overshoot.
pub fn parse_progress(line: &str, total_duration_secs: f64) -> Option<f64> {
    let regex = TIME_MARKER.as_ref()?;
    let caps = regex.captures(line)?;

    let hours: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: u32 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;

    let elapsed = TimeParser::clock_seconds(hours, minutes, seconds);
    Some(elapsed / total_duration_secs * 100.0)
}

/// Converts encoder notifications into raw percentages
#[derive(Debug, Clone, Copy)]
pub struct ProgressMonitor {
    total_duration_secs: f64,
}

impl ProgressMonitor {
    pub fn new(total_duration_secs: f64) -> Self {
        Self {
            total_duration_secs,
        }
    }

    /// Raw percentage for a notification; `None` when it carries no progress
    pub fn percent_for(&self, event: &EncoderEvent) -> Option<f64> {
        match event {
            EncoderEvent::LogLine(line) => {
                trace!(target: "encoder", "{}", line);
                if self.total_duration_secs > 0.0 {
                    parse_progress(line, self.total_duration_secs)
                } else {
                    None
                }
            }
            EncoderEvent::Fraction(fraction) => Some(fraction * 100.0),
            EncoderEvent::Exit(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Encoding,
    Terminal,
}

/// Single delivery point for one operation's events.
///
/// Progress is clamped and forwarded only while the gate is open; the first
/// terminal outcome closes it, later ones are dropped.
pub struct ProgressGate {
    state: Mutex<GateState>,
    sink: UnboundedSender<OperationEvent>,
}

impl ProgressGate {
    pub fn new(sink: UnboundedSender<OperationEvent>) -> Self {
        Self {
            state: Mutex::new(GateState::Encoding),
            sink,
        }
    }

    /// Forward a clamped progress event; false once the operation is terminal
    pub fn progress(&self, raw_percent: f64) -> bool {
        let state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *state == GateState::Terminal {
            return false;
        }
        // Sent under the lock so a concurrent finish cannot slip in between
        let _ = self
            .sink
            .send(OperationEvent::Progress(ProgressEvent::clamped(raw_percent)));
        true
    }

    /// Deliver the terminal outcome; true only for the first call
    pub fn finish(&self, outcome: TerminalOutcome) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *state == GateState::Terminal {
            return false;
        }
        *state = GateState::Terminal;
        let _ = self.sink.send(OperationEvent::Terminal(outcome));
        true
    }

    pub fn is_terminal(&self) -> bool {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) == GateState::Terminal
    }
}
