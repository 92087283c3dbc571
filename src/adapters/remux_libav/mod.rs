// Remux LibAV adapter - Packet-level demux/mux using libav, no decoding

use std::path::{Path, PathBuf};

use ffmpeg_next::codec;
use ffmpeg_next::format::{self, stream::Disposition};
use ffmpeg_next::media;
use ffmpeg_next::{Dictionary, Packet, Rational, Rescale};
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::rules::MetadataRules;
use crate::ports::*;

const MICROS: Rational = Rational(1, 1_000_000);

/// Track description carrying the codec parameters copied into the destination
pub struct LibavTrackFormat {
    mime: String,
    parameters: codec::Parameters,
}

impl TrackFormat for LibavTrackFormat {
    fn mime_type(&self) -> &str {
        &self.mime
    }

    // libav does not declare a per-track maximum; the remuxer grows its buffer instead
    fn max_input_size(&self) -> Option<usize> {
        None
    }
}

/// LibAV-based demux/mux backend
pub struct LibavRemuxBackend;

impl LibavRemuxBackend {
    /// Create new LibAV remux backend
    pub fn new() -> Result<Self, DomainError> {
        ffmpeg_next::init()
            .map_err(|e| DomainError::RemuxFailure(format!("Failed to initialize FFmpeg: {}", e)))?;
        Ok(Self)
    }
}

impl RemuxBackend for LibavRemuxBackend {
    type Format = LibavTrackFormat;
    type Demuxer = LibavDemuxer;
    type Muxer = LibavMuxer;

    fn open_demuxer(&self, source: &Path) -> Result<Self::Demuxer, DomainError> {
        LibavDemuxer::open(source)
    }

    fn create_muxer(&self, output: &Path) -> Result<Self::Muxer, DomainError> {
        LibavMuxer::create(output)
    }
}

/// Sample cursor over a libav input context
pub struct LibavDemuxer {
    input: format::context::Input,
    selected: Vec<bool>,
    time_bases: Vec<Rational>,
    current: Option<Packet>,
}

impl LibavDemuxer {
    fn open(source: &Path) -> Result<Self, DomainError> {
        let input = format::input(&source).map_err(|e| {
            DomainError::RemuxFailure(format!("Failed to open input {}: {}", source.display(), e))
        })?;
        let time_bases = input.streams().map(|stream| stream.time_base()).collect::<Vec<_>>();

        let mut demuxer = Self {
            selected: vec![false; time_bases.len()],
            time_bases,
            input,
            current: None,
        };
        demuxer.read_next()?;
        Ok(demuxer)
    }

    // Load the next packet into the cursor; false at end of stream
    fn read_next(&mut self) -> Result<bool, DomainError> {
        let mut packet = Packet::empty();
        match packet.read(&mut self.input) {
            Ok(()) => {
                self.current = Some(packet);
                Ok(true)
            }
            Err(ffmpeg_next::Error::Eof) => {
                self.current = None;
                Ok(false)
            }
            Err(e) => {
                self.current = None;
                Err(DomainError::RemuxFailure(format!("Failed to read packet: {}", e)))
            }
        }
    }

    fn to_micros(&self, track: usize, ts: i64) -> i64 {
        match self.time_bases.get(track) {
            Some(time_base) => ts.rescale(*time_base, MICROS),
            None => ts,
        }
    }
}

impl Demuxer for LibavDemuxer {
    type Format = LibavTrackFormat;

    fn track_count(&self) -> usize {
        self.time_bases.len()
    }

    fn track_format(&self, index: usize) -> Result<Self::Format, DomainError> {
        let stream = self
            .input
            .stream(index)
            .ok_or_else(|| DomainError::RemuxFailure(format!("No track {}", index)))?;
        let parameters = stream.parameters();
        let codec_name = parameters.id().name().to_string();

        let mime = match parameters.medium() {
            // Cover art is stored as a one-frame video stream
            media::Type::Video if stream.disposition().contains(Disposition::ATTACHED_PIC) => {
                format!("image/{}", codec_name)
            }
            media::Type::Video => MetadataRules::video_mime_for_codec(&codec_name),
            media::Type::Audio => MetadataRules::audio_mime_for_codec(&codec_name),
            media::Type::Subtitle => format!("text/{}", codec_name),
            _ => format!("application/{}", codec_name),
        };

        Ok(LibavTrackFormat { mime, parameters })
    }

    fn select_track(&mut self, index: usize) -> Result<(), DomainError> {
        let slot = self
            .selected
            .get_mut(index)
            .ok_or_else(|| DomainError::RemuxFailure(format!("No track {}", index)))?;
        *slot = true;
        Ok(())
    }

    fn seek_to_previous_sync(&mut self, time_micros: i64) -> Result<(), DomainError> {
        // Input-level seek timestamps are in AV_TIME_BASE (microseconds)
        self.input
            .seek(time_micros, i64::MIN..time_micros)
            .map_err(|e| DomainError::RemuxFailure(format!("Failed to seek: {}", e)))?;
        self.read_next()?;
        Ok(())
    }

    fn current_sample(&self) -> Option<SampleInfo> {
        let packet = self.current.as_ref()?;
        let track_index = packet.stream();
        // Edit-listed MP4s report priming packets with negative pts; they pass through as is
        let presentation = packet.pts().or(packet.dts()).unwrap_or(0);

        Some(SampleInfo {
            track_index,
            time_micros: self.to_micros(track_index, presentation),
            decode_time_micros: packet.dts().map(|dts| self.to_micros(track_index, dts)),
            size: packet.size(),
            is_sync: packet.is_key(),
        })
    }

    fn read_sample_data(&mut self, buffer: &mut [u8]) -> Result<usize, DomainError> {
        let data = self
            .current
            .as_ref()
            .and_then(|packet| packet.data())
            .unwrap_or(&[]);
        if data.len() > buffer.len() {
            return Err(DomainError::RemuxFailure(format!(
                "Sample of {} bytes exceeds buffer of {}",
                data.len(),
                buffer.len()
            )));
        }
        buffer[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn advance(&mut self) -> Result<bool, DomainError> {
        self.read_next()
    }
}

/// Copy of `source` with the container-specific codec tag cleared.
///
/// Tags from other containers (AVI fourccs, some Matroska ids) make the MP4 muxer
/// reject the header; a zero tag lets it pick its own.
fn muxable_parameters(source: &codec::Parameters) -> codec::Parameters {
    let mut parameters = source.clone();
    unsafe {
        (*parameters.as_mut_ptr()).codec_tag = 0;
    }
    parameters
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MuxerState {
    Created,
    Started,
    Stopped,
}

/// MP4 writer over a libav output context
pub struct LibavMuxer {
    output: format::context::Output,
    path: PathBuf,
    state: MuxerState,
    rotation: Option<u32>,
}

impl LibavMuxer {
    fn create(path: &Path) -> Result<Self, DomainError> {
        let output = format::output_as(&path, "mp4").map_err(|e| {
            DomainError::RemuxFailure(format!("Failed to create output {}: {}", path.display(), e))
        })?;
        Ok(Self {
            output,
            path: path.to_path_buf(),
            state: MuxerState::Created,
            rotation: None,
        })
    }
}

impl Muxer for LibavMuxer {
    type Format = LibavTrackFormat;

    fn add_track(&mut self, format: &Self::Format) -> Result<usize, DomainError> {
        if self.state != MuxerState::Created {
            return Err(DomainError::RemuxFailure(
                "Tracks cannot be added after the muxer started".to_string(),
            ));
        }
        let mut stream = self
            .output
            .add_stream(ffmpeg_next::encoder::find(codec::Id::None))
            .map_err(|e| DomainError::RemuxFailure(format!("Failed to add stream: {}", e)))?;
        stream.set_parameters(muxable_parameters(&format.parameters));
        Ok(stream.index())
    }

    fn set_orientation_hint(&mut self, degrees: u32) -> Result<(), DomainError> {
        if self.state != MuxerState::Created {
            return Err(DomainError::RemuxFailure(
                "Orientation must be set before the muxer starts".to_string(),
            ));
        }
        self.rotation = Some(degrees);
        Ok(())
    }

    fn start(&mut self) -> Result<(), DomainError> {
        if let Some(degrees) = self.rotation {
            let video_index = self
                .output
                .streams()
                .find(|stream| stream.parameters().medium() == media::Type::Video)
                .map(|stream| stream.index());
            if let Some(index) = video_index {
                if let Some(mut stream) = self.output.stream_mut(index) {
                    let mut metadata = Dictionary::new();
                    metadata.set("rotate", &degrees.to_string());
                    stream.set_metadata(metadata);
                }
            }
        }

        self.output
            .write_header()
            .map_err(|e| DomainError::RemuxFailure(format!("Failed to write header: {}", e)))?;
        self.state = MuxerState::Started;
        debug!(output = %self.path.display(), "Muxer started");
        Ok(())
    }

    fn write_sample(
        &mut self,
        track_index: usize,
        data: &[u8],
        info: &SampleInfo,
    ) -> Result<(), DomainError> {
        if self.state != MuxerState::Started {
            return Err(DomainError::RemuxFailure("Muxer is not started".to_string()));
        }
        let time_base = self
            .output
            .stream(track_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| DomainError::RemuxFailure(format!("No output track {}", track_index)))?;

        let mut packet = Packet::copy(data);
        packet.set_stream(track_index);
        packet.set_pts(Some(info.time_micros.rescale(MICROS, time_base)));
        packet.set_dts(
            info.decode_time_micros
                .map(|dts| dts.rescale(MICROS, time_base)),
        );
        packet.set_position(-1);
        if info.is_sync {
            packet.set_flags(ffmpeg_next::packet::Flags::KEY);
        }

        packet
            .write_interleaved(&mut self.output)
            .map_err(|e| DomainError::RemuxFailure(format!("Failed to write packet: {}", e)))
    }

    fn stop(&mut self) -> Result<(), DomainError> {
        if self.state != MuxerState::Started {
            return Ok(());
        }
        self.state = MuxerState::Stopped;
        self.output
            .write_trailer()
            .map_err(|e| DomainError::RemuxFailure(format!("Failed to write trailer: {}", e)))
    }
}
