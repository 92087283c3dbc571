// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::AppConfig;
use crate::domain::errors::*;
use crate::domain::model::*;

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe a media file; invoked once per operation that needs source metadata
    async fn probe(&self, path: &Path) -> Result<MediaInfo, DomainError>;
}

/// Format parameters of one container track
pub trait TrackFormat {
    /// Declared MIME type, e.g. `video/avc`
    fn mime_type(&self) -> &str;

    /// Largest sample the track declares, when known
    fn max_input_size(&self) -> Option<usize>;
}

/// One demuxed sample's metadata, without its bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleInfo {
    pub track_index: usize,
    /// Presentation time; negative for pre-roll such as AAC priming samples
    pub time_micros: i64,
    /// Decode time, when the container carries one separately
    pub decode_time_micros: Option<i64>,
    pub size: usize,
    pub is_sync: bool,
}

impl SampleInfo {
    /// Same sample shifted so `origin_micros` becomes zero
    pub fn rebased(&self, origin_micros: i64) -> Self {
        Self {
            time_micros: self.time_micros - origin_micros,
            decode_time_micros: self.decode_time_micros.map(|dts| dts - origin_micros),
            ..*self
        }
    }
}

/// Sample-level reader over a source container
pub trait Demuxer {
    type Format: TrackFormat;

    fn track_count(&self) -> usize;

    fn track_format(&self, index: usize) -> Result<Self::Format, DomainError>;

    /// Include a track in subsequent reads
    fn select_track(&mut self, index: usize) -> Result<(), DomainError>;

    /// Position on the last sync sample at or before `time_micros`
    fn seek_to_previous_sync(&mut self, time_micros: i64) -> Result<(), DomainError>;

    /// Sample under the read cursor; `None` is the only end-of-stream signal
    fn current_sample(&self) -> Option<SampleInfo>;

    /// Copy the current sample's bytes into `buffer`, returning the byte count
    fn read_sample_data(&mut self, buffer: &mut [u8]) -> Result<usize, DomainError>;

    /// Move to the next sample; false once the stream is exhausted
    fn advance(&mut self) -> Result<bool, DomainError>;
}

/// Sample-level writer into a destination container
pub trait Muxer {
    type Format: TrackFormat;

    /// Add a track copying `format` verbatim; only valid before `start`
    fn add_track(&mut self, format: &Self::Format) -> Result<usize, DomainError>;

    /// Container rotation metadata
    fn set_orientation_hint(&mut self, degrees: u32) -> Result<(), DomainError>;

    fn start(&mut self) -> Result<(), DomainError>;

    fn write_sample(
        &mut self,
        track_index: usize,
        data: &[u8],
        info: &SampleInfo,
    ) -> Result<(), DomainError>;

    /// Finalize the container; a no-op when never started or already stopped
    fn stop(&mut self) -> Result<(), DomainError>;
}

/// Factory for the demuxer/muxer pair used by one remux operation
pub trait RemuxBackend: Send + Sync {
    type Format: TrackFormat;
    type Demuxer: Demuxer<Format = Self::Format>;
    type Muxer: Muxer<Format = Self::Format>;

    fn open_demuxer(&self, source: &Path) -> Result<Self::Demuxer, DomainError>;

    fn create_muxer(&self, output: &Path) -> Result<Self::Muxer, DomainError>;
}

/// Port for lossless segment extraction
pub trait SegmentPort: Send + Sync {
    /// Copy `window` of `source` into `output`; `Ok(true)` iff a non-empty file was produced
    fn extract_segment(
        &self,
        source: &Path,
        output: &Path,
        window: TrimWindow,
        rotation_degrees: u32,
    ) -> Result<bool, DomainError>;
}

/// Work handed to an encoder engine
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeJob {
    /// Argument list for the external command-line transcoder plus the duration progress is measured against
    Command {
        args: Vec<String>,
        total_duration_secs: f64,
    },
    /// Structured job for the in-process engine
    Structured {
        input: PathBuf,
        output: PathBuf,
        format: FormatStrategy,
    },
}

/// Terminal condition reported by an encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderExit {
    Success,
    Canceled,
    Failed(String),
}

/// Notification from a running encoder
#[derive(Debug, Clone, PartialEq)]
pub enum EncoderEvent {
    /// Free-text log line, scraped for progress markers
    LogLine(String),
    /// Direct progress in [0, 1]
    Fraction(f64),
    /// Exactly one per launch, always the last event sent
    Exit(EncoderExit),
}

/// Port for encoder engines
pub trait EncoderPort: Send + Sync {
    /// Start the job and return immediately; events arrive on `events` until `Exit`.
    ///
    /// An error here means nothing was launched and no events will follow.
    fn launch(
        &self,
        job: EncodeJob,
        events: UnboundedSender<EncoderEvent>,
    ) -> Result<(), DomainError>;
}

/// Port for configuration loading
pub trait ConfigPort: Send + Sync {
    /// Load the layered configuration, optionally from an explicit file
    fn load_config(&self, explicit_path: Option<&Path>) -> Result<AppConfig, DomainError>;
}
