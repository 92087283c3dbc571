// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Microseconds in one second, the unit every sample timestamp is expressed in
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Effective display orientation of a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// Portrait iff the stored frame is taller than wide XOR a quarter-turn rotation applies
    pub fn from_dimensions(width: u32, height: u32, rotation_degrees: u32) -> Self {
        let stored_portrait = width < height;
        let quarter_turn = rotation_degrees == 90 || rotation_degrees == 270;
        if stored_portrait ^ quarter_turn {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => write!(f, "portrait"),
            Orientation::Landscape => write!(f, "landscape"),
        }
    }
}

/// Probed media metadata, immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub rotation_degrees: u32,
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    #[serde(rename = "bitrate")]
    pub bitrate_bps: u64,
    pub orientation: Orientation,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    #[serde(rename = "videoMediaType")]
    pub video_mime_type: Option<String>,
    #[serde(rename = "audioMediaType")]
    pub audio_mime_type: Option<String>,
}

impl MediaInfo {
    /// Create media info; orientation is derived, never supplied
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        width: u32,
        height: u32,
        rotation_degrees: u32,
        duration_seconds: f64,
        bitrate_bps: u64,
        size_bytes: u64,
        video_mime_type: Option<String>,
        audio_mime_type: Option<String>,
    ) -> Result<Self, DomainError> {
        if !matches!(rotation_degrees, 0 | 90 | 180 | 270) {
            return Err(DomainError::Probe(format!(
                "Unsupported rotation: {} degrees",
                rotation_degrees
            )));
        }
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(DomainError::Probe(format!(
                "Invalid duration: {}",
                duration_seconds
            )));
        }

        Ok(Self {
            width,
            height,
            rotation_degrees,
            duration_seconds,
            bitrate_bps,
            orientation: Orientation::from_dimensions(width, height, rotation_degrees),
            size_bytes,
            video_mime_type,
            audio_mime_type,
        })
    }

    /// Frame size as displayed, sides swapped for quarter-turn rotations
    pub fn display_dimension(&self) -> Dimension {
        if matches!(self.rotation_degrees, 90 | 270) {
            Dimension::new(self.height, self.width)
        } else {
            Dimension::new(self.width, self.height)
        }
    }
}

/// Width/height pair; a (0,0) bound means "no scaling constraint"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl Dimension {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when neither side constrains the output
    pub fn is_unbounded(&self) -> bool {
        self.width == 0 && self.height == 0
    }

    /// Round both sides down to even values (chroma-subsampled encoders reject odd sizes)
    pub fn even(&self) -> Self {
        Self {
            width: (self.width & !1).max(2),
            height: (self.height & !1).max(2),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Time-bounded window of a source stream, in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimWindow {
    pub start_micros: i64,
    pub end_micros: i64,
}

impl TrimWindow {
    pub fn new(start_micros: i64, end_micros: i64) -> Self {
        Self {
            start_micros,
            end_micros,
        }
    }

    /// Window starting at zero and lasting `seconds`
    pub fn leading_seconds(seconds: f64) -> Self {
        Self::new(0, (seconds * MICROS_PER_SECOND as f64).round() as i64)
    }

    /// A window whose end does not follow its start selects nothing
    pub fn is_empty(&self) -> bool {
        self.end_micros <= self.start_micros || self.start_micros < 0
    }

    pub fn duration_micros(&self) -> i64 {
        (self.end_micros - self.start_micros).max(0)
    }

    /// Whether a sample timestamp falls past the end of the window
    pub fn is_past_end(&self, time_micros: i64) -> bool {
        time_micros > self.end_micros
    }

    /// Re-base a source timestamp so the window starts at zero
    pub fn rebase(&self, time_micros: i64) -> i64 {
        time_micros - self.start_micros
    }
}

/// Sparse mapping from source track index to destination track index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMapping {
    slots: Vec<Option<usize>>,
}

impl TrackMapping {
    /// Mapping over `track_count` source tracks, all excluded
    pub fn new(track_count: usize) -> Self {
        Self {
            slots: vec![None; track_count],
        }
    }

    pub fn map(&mut self, source: usize, destination: usize) {
        if let Some(slot) = self.slots.get_mut(source) {
            *slot = Some(destination);
        }
    }

    /// Destination for a source track, `None` when excluded
    pub fn destination(&self, source: usize) -> Option<usize> {
        self.slots.get(source).copied().flatten()
    }

    pub fn selected_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.selected_count() == 0
    }
}

/// Audio bitrate or channel count, or the "keep the source value" sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioSetting {
    #[default]
    AsIs,
    Value(u32),
}

impl AudioSetting {
    /// Interpret a raw option where any negative value is the as-is sentinel
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            AudioSetting::AsIs
        } else {
            AudioSetting::Value(raw.min(u32::MAX as i64) as u32)
        }
    }

    pub fn value_or(&self, fallback: u32) -> u32 {
        match self {
            AudioSetting::AsIs => fallback,
            AudioSetting::Value(value) => *value,
        }
    }

    pub fn is_as_is(&self) -> bool {
        matches!(self, AudioSetting::AsIs)
    }
}

/// How the encode step is carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeStrategy {
    /// External command-line transcoder, trim folded into its duration argument
    #[default]
    #[serde(rename = "cli")]
    ExternalEncoderCli,
    /// Native engine fed by a lossless demux/remux pre-trim
    #[serde(rename = "native")]
    NativeDemuxRemux,
}

impl FromStr for EncodeStrategy {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "cli" | "ffmpeg" => Ok(EncodeStrategy::ExternalEncoderCli),
            "native" | "mediacodec" => Ok(EncodeStrategy::NativeDemuxRemux),
            other => Err(DomainError::BadArgs(format!(
                "Unknown strategy: {}. Valid strategies: cli, native",
                other
            ))),
        }
    }
}

impl fmt::Display for EncodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeStrategy::ExternalEncoderCli => write!(f, "cli"),
            EncodeStrategy::NativeDemuxRemux => write!(f, "native"),
        }
    }
}

/// Immutable input to one operation
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeOptions {
    pub source_path: PathBuf,
    pub output_base_name: String,
    pub desired: Dimension,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate: AudioSetting,
    pub audio_channels: AudioSetting,
    /// 0 means "use the full source"
    pub requested_duration_secs: u64,
    pub thumbnail_time_secs: u64,
    pub strategy: EncodeStrategy,
}

impl TranscodeOptions {
    /// Options with no constraints beyond source and output name
    pub fn new(source_path: impl Into<PathBuf>, output_base_name: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            output_base_name: output_base_name.into(),
            desired: Dimension::default(),
            video_bitrate_kbps: 0,
            audio_bitrate: AudioSetting::AsIs,
            audio_channels: AudioSetting::AsIs,
            requested_duration_secs: 0,
            thumbnail_time_secs: 0,
            strategy: EncodeStrategy::default(),
        }
    }

    pub fn with_dimension(mut self, width: u32, height: u32) -> Self {
        self.desired = Dimension::new(width, height);
        self
    }

    pub fn with_video_bitrate_kbps(mut self, kbps: u32) -> Self {
        self.video_bitrate_kbps = kbps;
        self
    }

    pub fn with_audio(mut self, bitrate: AudioSetting, channels: AudioSetting) -> Self {
        self.audio_bitrate = bitrate;
        self.audio_channels = channels;
        self
    }

    pub fn with_duration(mut self, seconds: u64) -> Self {
        self.requested_duration_secs = seconds;
        self
    }

    pub fn with_thumbnail_time(mut self, seconds: u64) -> Self {
        self.thumbnail_time_secs = seconds;
        self
    }

    pub fn with_strategy(mut self, strategy: EncodeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source_path
    }
}

/// Native engine output parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatStrategy {
    pub video_bitrate_bps: u64,
    pub frame_rate: u32,
    pub desired: Dimension,
    pub audio_bitrate: AudioSetting,
    pub audio_channels: AudioSetting,
}

/// Video encoder settings resolved against a concrete source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoOutputFormat {
    pub dimension: Dimension,
    pub bitrate_bps: u64,
    pub frame_rate: u32,
    pub key_frame_interval_secs: u32,
}

/// Audio encoder settings resolved against a concrete source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioOutputFormat {
    pub bitrate_bps: u64,
    pub channels: u32,
    pub sample_rate: u32,
}

impl FormatStrategy {
    pub const DEFAULT_VIDEO_BITRATE: u64 = 9_000_000;
    pub const DEFAULT_FRAME_RATE: u32 = 30;
    pub const DEFAULT_AUDIO_BITRATE: u32 = 128_000;
    pub const I_FRAME_INTERVAL_SECS: u32 = 3;

    /// Derive the native engine settings from request options
    pub fn from_options(options: &TranscodeOptions) -> Self {
        let video_bitrate_bps = match options.video_bitrate_kbps {
            0 => Self::DEFAULT_VIDEO_BITRATE,
            kbps => kbps as u64 * 1000,
        };
        Self {
            video_bitrate_bps,
            frame_rate: Self::DEFAULT_FRAME_RATE,
            desired: options.desired,
            audio_bitrate: options.audio_bitrate,
            audio_channels: options.audio_channels,
        }
    }

    /// Video settings for a source of the given stored size
    pub fn video_output(&self, in_width: u32, in_height: u32) -> VideoOutputFormat {
        let dimension = crate::domain::rules::DimensionCalculator::compute_output_dimension(
            in_width,
            in_height,
            self.desired.width,
            self.desired.height,
        );
        VideoOutputFormat {
            dimension: dimension.even(),
            bitrate_bps: self.video_bitrate_bps,
            frame_rate: self.frame_rate,
            key_frame_interval_secs: Self::I_FRAME_INTERVAL_SECS,
        }
    }

    /// Audio settings for a source track, `None` when the track passes through untouched
    pub fn audio_output(
        &self,
        source_is_aac: bool,
        source_channels: u32,
        source_sample_rate: u32,
    ) -> Option<AudioOutputFormat> {
        if self.audio_bitrate.is_as_is() && self.audio_channels.is_as_is() && source_is_aac {
            return None;
        }
        Some(AudioOutputFormat {
            bitrate_bps: self.audio_bitrate.value_or(Self::DEFAULT_AUDIO_BITRATE) as u64,
            channels: self.audio_channels.value_or(source_channels),
            sample_rate: source_sample_rate,
        })
    }
}

/// Normalized progress notification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub percent: f64,
}

impl ProgressEvent {
    /// Clamp a raw percentage into [0, 100]; non-finite values read as 0
    pub fn clamped(raw_percent: f64) -> Self {
        let percent = if raw_percent.is_finite() {
            raw_percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self { percent }
    }
}

/// Exactly one of these ends every operation
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalOutcome {
    Completed { output_path: PathBuf },
    Canceled,
    Failed { message: String },
}

impl TerminalOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        TerminalOutcome::Failed {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, TerminalOutcome::Completed { .. })
    }
}

impl From<DomainError> for TerminalOutcome {
    fn from(err: DomainError) -> Self {
        if err.is_canceled() {
            TerminalOutcome::Canceled
        } else {
            TerminalOutcome::Failed {
                message: err.to_string(),
            }
        }
    }
}

/// Item of the per-operation response stream
#[derive(Debug, Clone, PartialEq)]
pub enum OperationEvent {
    Progress(ProgressEvent),
    Terminal(TerminalOutcome),
}

impl OperationEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationEvent::Terminal(_))
    }
}

/// Wire shape delivered to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeResponse {
    pub progress: f64,
    pub completed: bool,
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl TranscodeResponse {
    /// Progress responses keep the caller listening; terminal ones close the sequence
    pub fn keep_callback(&self) -> bool {
        !self.completed && !self.error
    }
}

impl From<&OperationEvent> for TranscodeResponse {
    fn from(event: &OperationEvent) -> Self {
        match event {
            OperationEvent::Progress(progress) => Self {
                progress: progress.percent,
                completed: false,
                error: false,
                message: None,
                data: None,
            },
            OperationEvent::Terminal(TerminalOutcome::Completed { output_path }) => Self {
                progress: 100.0,
                completed: true,
                error: false,
                message: Some("Completed!".to_string()),
                data: Some(output_path.to_string_lossy().to_string()),
            },
            OperationEvent::Terminal(TerminalOutcome::Canceled) => Self {
                progress: 0.0,
                completed: false,
                error: true,
                message: Some("Transcode canceled!".to_string()),
                data: None,
            },
            OperationEvent::Terminal(TerminalOutcome::Failed { message }) => Self {
                progress: 0.0,
                completed: false,
                error: true,
                message: Some(message.clone()),
                data: None,
            },
        }
    }
}

#[cfg(test)]
mod tests;
