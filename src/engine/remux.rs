//! Lossless segment extraction: demux a time window and remux it without re-encoding

use std::path::Path;

use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::{TrackMapping, TrimWindow};
use crate::domain::rules::MetadataRules;
use crate::ports::{Demuxer, Muxer, RemuxBackend, SegmentPort, TrackFormat};
use crate::utils::PathUtils;

/// Smallest sample buffer, whatever the tracks declare
pub const MIN_SAMPLE_BUFFER: usize = 256 * 1024;

/// Copies the audio/video samples of a window into a new container
pub struct TrackDemuxRemuxer<B: RemuxBackend> {
    backend: B,
}

impl<B: RemuxBackend> TrackDemuxRemuxer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Extract `window` of `source` into `output`.
    ///
    /// Returns `Ok(true)` iff a non-empty output file exists afterwards. An empty
    /// window returns `Ok(false)` without touching the destination; a source with
    /// no audio or video track fails before the destination is created.
    pub fn extract_segment(
        &self,
        source: &Path,
        output: &Path,
        window: TrimWindow,
        rotation_degrees: u32,
    ) -> Result<bool, DomainError> {
        if window.is_empty() {
            debug!(
                start = window.start_micros,
                end = window.end_micros,
                "Rejecting empty trim window"
            );
            return Ok(false);
        }

        let mut demuxer = self.backend.open_demuxer(source)?;
        let (mapping, formats, buffer_size) = Self::select_tracks(&mut demuxer)?;
        if formats.is_empty() {
            return Err(DomainError::RemuxFailure(format!(
                "No audio or video tracks in {}",
                source.display()
            )));
        }

        let mut muxer = self.backend.create_muxer(output)?;
        let copied = Self::copy_window(
            &mut demuxer,
            &mut muxer,
            mapping,
            &formats,
            window,
            rotation_degrees,
            buffer_size,
        );

        // Stop runs on every path; its own failure never masks the copy error
        let stopped = muxer.stop();
        drop(muxer);
        drop(demuxer);

        let samples = match (copied, stopped) {
            (Err(err), stop_result) => {
                if let Err(stop_err) = stop_result {
                    warn!(error = %stop_err, "Muxer stop failed after remux error");
                }
                return Err(err);
            }
            (Ok(_), Err(stop_err)) => return Err(stop_err),
            (Ok(samples), Ok(())) => samples,
        };

        let produced = PathUtils::new().is_non_empty_file(output);
        info!(
            output = %output.display(),
            window_micros = window.duration_micros(),
            samples,
            produced,
            "Segment extraction finished"
        );
        Ok(produced)
    }

    // Select every video/audio track; the mapping is filled once destination tracks exist
    fn select_tracks(
        demuxer: &mut B::Demuxer,
    ) -> Result<(TrackMapping, Vec<(usize, B::Format)>, usize), DomainError> {
        let track_count = demuxer.track_count();
        let mut formats = Vec::new();
        let mut buffer_size = MIN_SAMPLE_BUFFER;

        for index in 0..track_count {
            let format = demuxer.track_format(index)?;
            if !MetadataRules::is_remuxable_mime(format.mime_type()) {
                debug!(track = index, mime = format.mime_type(), "Excluding track");
                continue;
            }
            demuxer.select_track(index)?;
            buffer_size = buffer_size.max(format.max_input_size().unwrap_or(0));
            formats.push((index, format));
        }

        Ok((TrackMapping::new(track_count), formats, buffer_size))
    }

    fn copy_window(
        demuxer: &mut B::Demuxer,
        muxer: &mut B::Muxer,
        mut mapping: TrackMapping,
        formats: &[(usize, B::Format)],
        window: TrimWindow,
        rotation_degrees: u32,
        buffer_size: usize,
    ) -> Result<u64, DomainError> {
        for (source_index, format) in formats {
            let destination = muxer.add_track(format)?;
            mapping.map(*source_index, destination);
        }

        if rotation_degrees != 0 {
            if let Err(err) = muxer.set_orientation_hint(rotation_degrees) {
                warn!(rotation_degrees, error = %err, "Could not set orientation hint");
            }
        }

        muxer.start()?;
        demuxer.seek_to_previous_sync(window.start_micros)?;

        let mut buffer = vec![0u8; buffer_size];
        let mut samples = 0u64;

        while let Some(sample) = demuxer.current_sample() {
            let Some(destination) = mapping.destination(sample.track_index) else {
                if !demuxer.advance()? {
                    break;
                }
                continue;
            };

            // Pre-roll samples (negative times) are copied; only `None` ends the stream
            if window.is_past_end(sample.time_micros) {
                break;
            }

            if sample.size > buffer.len() {
                buffer.resize(sample.size, 0);
            }
            let size = demuxer.read_sample_data(&mut buffer)?;
            muxer.write_sample(
                destination,
                &buffer[..size],
                &sample.rebased(window.start_micros),
            )?;
            samples += 1;

            if !demuxer.advance()? {
                break;
            }
        }

        Ok(samples)
    }
}

impl<B: RemuxBackend> SegmentPort for TrackDemuxRemuxer<B> {
    fn extract_segment(
        &self,
        source: &Path,
        output: &Path,
        window: TrimWindow,
        rotation_degrees: u32,
    ) -> Result<bool, DomainError> {
        TrackDemuxRemuxer::extract_segment(self, source, output, window, rotation_degrees)
    }
}
