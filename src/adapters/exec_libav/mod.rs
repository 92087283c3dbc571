// Exec LibAV adapter - In-process transcode engine using libav

use std::path::Path;

use ffmpeg_next::codec::{self, capabilities::Capabilities};
use ffmpeg_next::format::{self, sample::Type as SampleType, Pixel, Sample};
use ffmpeg_next::software::scaling::{Context as Scaler, Flags as ScaleFlags};
use ffmpeg_next::util::frame::{audio::Audio as AudioFrame, video::Video as VideoFrame};
use ffmpeg_next::{channel_layout::ChannelLayout, encoder, filter, media, Packet, Rational, Rescale};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::error::{VideoHelperError, VideoHelperResult};
use crate::ports::*;

const MICROS: Rational = Rational(1, 1_000_000);

/// Native engine: decode, scale and re-encode without an external process
pub struct LibavNativeEncoder;

impl LibavNativeEncoder {
    /// Create new native encoder
    pub fn new() -> Result<Self, DomainError> {
        ffmpeg_next::init().map_err(|e| {
            DomainError::EncodeFailure(format!("Failed to initialize FFmpeg: {}", e))
        })?;
        Ok(Self)
    }
}

impl EncoderPort for LibavNativeEncoder {
    fn launch(
        &self,
        job: EncodeJob,
        events: UnboundedSender<EncoderEvent>,
    ) -> Result<(), DomainError> {
        let EncodeJob::Structured {
            input,
            output,
            format,
        } = job
        else {
            return Err(DomainError::BadArgs(
                "Native encoder needs a structured job".to_string(),
            ));
        };
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| DomainError::EncodeFailure(format!("No async runtime: {}", e)))?;

        handle.spawn_blocking(move || {
            let exit = match transcode(&input, &output, &format, &events) {
                Ok(()) => EncoderExit::Success,
                Err(VideoHelperError::FFmpegError(ffmpeg_next::Error::Exit)) => {
                    EncoderExit::Canceled
                }
                Err(err) => EncoderExit::Failed(err.to_string()),
            };
            let _ = events.send(EncoderEvent::Exit(exit));
        });
        Ok(())
    }
}

/// Sends fractional progress when it advances by at least a percent
struct ProgressReporter<'a> {
    events: &'a UnboundedSender<EncoderEvent>,
    total_micros: i64,
    last_percent: i64,
}

impl ProgressReporter<'_> {
    fn report(&mut self, position_micros: i64) {
        if self.total_micros <= 0 {
            return;
        }
        let percent = position_micros * 100 / self.total_micros;
        if percent > self.last_percent {
            self.last_percent = percent;
            let fraction = position_micros as f64 / self.total_micros as f64;
            let _ = self.events.send(EncoderEvent::Fraction(fraction));
        }
    }
}

struct VideoPipeline {
    ist_index: usize,
    ist_time_base: Rational,
    ost_index: usize,
    decoder: codec::decoder::Video,
    encoder: codec::encoder::video::Encoder,
    scaler: Scaler,
    encoder_time_base: Rational,
    last_pts: Option<i64>,
}

impl VideoPipeline {
    fn new(
        ictx: &format::context::Input,
        octx: &mut format::context::Output,
        strategy: &FormatStrategy,
    ) -> VideoHelperResult<Self> {
        let ist = ictx
            .streams()
            .best(media::Type::Video)
            .ok_or_else(|| DomainError::EncodeFailure("No video track to encode".to_string()))?;
        let ist_index = ist.index();
        let ist_time_base = ist.time_base();

        let decoder = codec::context::Context::from_parameters(ist.parameters())?
            .decoder()
            .video()?;

        let target = strategy.video_output(decoder.width(), decoder.height());
        let codec = encoder::find(codec::Id::H264)
            .or_else(|| encoder::find(codec::Id::MPEG4))
            .ok_or_else(|| DomainError::EncodeFailure("No H.264 or MPEG-4 encoder".to_string()))?;
        let global_header = octx
            .format()
            .flags()
            .contains(format::flag::Flags::GLOBAL_HEADER);

        let mut ost = octx.add_stream(codec)?;
        let ost_index = ost.index();
        let encoder_time_base = Rational(1, target.frame_rate as i32);

        let mut settings = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        settings.set_width(target.dimension.width);
        settings.set_height(target.dimension.height);
        settings.set_format(Pixel::YUV420P);
        settings.set_time_base(encoder_time_base);
        settings.set_frame_rate(Some(Rational(target.frame_rate as i32, 1)));
        settings.set_bit_rate(target.bitrate_bps as usize);
        settings.set_gop(target.frame_rate * target.key_frame_interval_secs);
        if global_header {
            settings.set_flags(codec::flag::Flags::GLOBAL_HEADER);
        }

        let encoder = settings.open_as(codec)?;
        ost.set_parameters(&encoder);
        ost.set_time_base(encoder_time_base);

        let scaler = Scaler::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::YUV420P,
            target.dimension.width,
            target.dimension.height,
            ScaleFlags::BILINEAR,
        )?;

        info!(
            from = %Dimension::new(decoder.width(), decoder.height()),
            to = %target.dimension,
            bitrate = target.bitrate_bps,
            "Video encoder configured"
        );

        Ok(Self {
            ist_index,
            ist_time_base,
            ost_index,
            decoder,
            encoder,
            scaler,
            encoder_time_base,
            last_pts: None,
        })
    }

    fn send_packet(
        &mut self,
        packet: &Packet,
        octx: &mut format::context::Output,
        progress: &mut ProgressReporter<'_>,
    ) -> VideoHelperResult<()> {
        self.decoder.send_packet(packet)?;
        self.receive_frames(octx, progress)
    }

    fn receive_frames(
        &mut self,
        octx: &mut format::context::Output,
        progress: &mut ProgressReporter<'_>,
    ) -> VideoHelperResult<()> {
        let mut decoded = VideoFrame::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let Some(timestamp) = decoded.timestamp() else {
                continue;
            };
            // Constant output rate: frames landing on an already used slot are dropped
            let pts = timestamp.rescale(self.ist_time_base, self.encoder_time_base);
            if self.last_pts.is_some_and(|last| pts <= last) {
                continue;
            }
            self.last_pts = Some(pts);

            let mut scaled = VideoFrame::empty();
            self.scaler.run(&decoded, &mut scaled)?;
            scaled.set_pts(Some(pts));
            self.encoder.send_frame(&scaled)?;
            self.write_packets(octx)?;

            progress.report(timestamp.rescale(self.ist_time_base, MICROS));
        }
        Ok(())
    }

    fn write_packets(&mut self, octx: &mut format::context::Output) -> VideoHelperResult<()> {
        let ost_time_base = output_time_base(octx, self.ost_index)?;
        let mut encoded = Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.ost_index);
            encoded.rescale_ts(self.encoder_time_base, ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }

    fn finish(
        &mut self,
        octx: &mut format::context::Output,
        progress: &mut ProgressReporter<'_>,
    ) -> VideoHelperResult<()> {
        self.decoder.send_eof()?;
        self.receive_frames(octx, progress)?;
        self.encoder.send_eof()?;
        self.write_packets(octx)
    }
}

enum AudioPipeline {
    /// AAC source kept as-is
    Copy {
        ist_index: usize,
        ist_time_base: Rational,
        ost_index: usize,
    },
    Encode(Box<AudioTranscoder>),
}

struct AudioTranscoder {
    ist_index: usize,
    ost_index: usize,
    decoder: codec::decoder::Audio,
    encoder: codec::encoder::audio::Encoder,
    graph: filter::Graph,
    encoder_time_base: Rational,
    next_sample: i64,
}

impl AudioPipeline {
    fn new(
        ictx: &format::context::Input,
        octx: &mut format::context::Output,
        strategy: &FormatStrategy,
    ) -> VideoHelperResult<Option<Self>> {
        let Some(ist) = ictx.streams().best(media::Type::Audio) else {
            return Ok(None);
        };
        let ist_index = ist.index();

        let mut decoder = codec::context::Context::from_parameters(ist.parameters())?
            .decoder()
            .audio()?;
        decoder.set_parameters(ist.parameters())?;

        let source_is_aac = ist.parameters().id() == codec::Id::AAC;
        let source_channels = decoder.channel_layout().channels().max(1) as u32;

        let Some(target) = strategy.audio_output(source_is_aac, source_channels, decoder.rate())
        else {
            let mut ost = octx.add_stream(encoder::find(codec::Id::None))?;
            ost.set_parameters(ist.parameters());
            debug!(track = ist_index, "Audio passes through");
            return Ok(Some(AudioPipeline::Copy {
                ist_index,
                ist_time_base: ist.time_base(),
                ost_index: ost.index(),
            }));
        };

        let codec = encoder::find(codec::Id::AAC)
            .ok_or_else(|| DomainError::EncodeFailure("No AAC encoder".to_string()))?
            .audio()?;
        let global_header = octx
            .format()
            .flags()
            .contains(format::flag::Flags::GLOBAL_HEADER);

        let mut ost = octx.add_stream(codec)?;
        let ost_index = ost.index();
        let encoder_time_base = Rational(1, target.sample_rate as i32);

        let mut settings = codec::context::Context::new_with_codec(*codec)
            .encoder()
            .audio()?;
        settings.set_rate(target.sample_rate as i32);
        settings.set_channel_layout(ChannelLayout::default(target.channels as i32));
        settings.set_format(
            codec
                .formats()
                .and_then(|mut formats| formats.next())
                .unwrap_or(Sample::F32(SampleType::Planar)),
        );
        settings.set_bit_rate(target.bitrate_bps as usize);
        settings.set_time_base(encoder_time_base);
        if global_header {
            settings.set_flags(codec::flag::Flags::GLOBAL_HEADER);
        }

        let encoder = settings.open_as(*codec)?;
        ost.set_parameters(&encoder);
        ost.set_time_base(encoder_time_base);

        let graph = resample_graph(&decoder, &encoder, ist.time_base())?;

        info!(
            channels = target.channels,
            bitrate = target.bitrate_bps,
            "Audio encoder configured"
        );

        Ok(Some(AudioPipeline::Encode(Box::new(AudioTranscoder {
            ist_index,
            ost_index,
            decoder,
            encoder,
            graph,
            encoder_time_base,
            next_sample: 0,
        }))))
    }

    fn input_index(&self) -> usize {
        match self {
            AudioPipeline::Copy { ist_index, .. } => *ist_index,
            AudioPipeline::Encode(transcoder) => transcoder.ist_index,
        }
    }

    fn send_packet(
        &mut self,
        mut packet: Packet,
        octx: &mut format::context::Output,
    ) -> VideoHelperResult<()> {
        match self {
            AudioPipeline::Copy {
                ist_time_base,
                ost_index,
                ..
            } => {
                let ost_time_base = output_time_base(octx, *ost_index)?;
                packet.rescale_ts(*ist_time_base, ost_time_base);
                packet.set_stream(*ost_index);
                packet.set_position(-1);
                packet.write_interleaved(octx)?;
                Ok(())
            }
            AudioPipeline::Encode(transcoder) => {
                transcoder.decoder.send_packet(&packet)?;
                transcoder.receive_frames(octx)
            }
        }
    }

    fn finish(&mut self, octx: &mut format::context::Output) -> VideoHelperResult<()> {
        let AudioPipeline::Encode(transcoder) = self else {
            return Ok(());
        };
        transcoder.decoder.send_eof()?;
        transcoder.receive_frames(octx)?;
        filter_context(&mut transcoder.graph, "in")?.source().flush()?;
        transcoder.drain_graph(octx)?;
        transcoder.encoder.send_eof()?;
        transcoder.write_packets(octx)
    }
}

impl AudioTranscoder {
    fn receive_frames(&mut self, octx: &mut format::context::Output) -> VideoHelperResult<()> {
        let mut decoded = AudioFrame::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let timestamp = decoded.timestamp();
            decoded.set_pts(timestamp);
            filter_context(&mut self.graph, "in")?
                .source()
                .add(&decoded)?;
            self.drain_graph(octx)?;
        }
        Ok(())
    }

    fn drain_graph(&mut self, octx: &mut format::context::Output) -> VideoHelperResult<()> {
        let mut filtered = AudioFrame::empty();
        loop {
            let pulled = filter_context(&mut self.graph, "out")?
                .sink()
                .frame(&mut filtered);
            if pulled.is_err() {
                break;
            }
            // Output timestamps follow the sample count
            filtered.set_pts(Some(self.next_sample));
            self.next_sample += filtered.samples() as i64;
            self.encoder.send_frame(&filtered)?;
            self.write_packets(octx)?;
        }
        Ok(())
    }

    fn write_packets(&mut self, octx: &mut format::context::Output) -> VideoHelperResult<()> {
        let ost_time_base = output_time_base(octx, self.ost_index)?;
        let mut encoded = Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.ost_index);
            encoded.rescale_ts(self.encoder_time_base, ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}

fn filter_context<'a>(
    graph: &'a mut filter::Graph,
    name: &str,
) -> VideoHelperResult<filter::context::Context<'a>> {
    graph
        .get(name)
        .ok_or_else(|| DomainError::EncodeFailure(format!("Missing filter pad {}", name)).into())
}

// abuffer -> anull -> abuffersink converting to the encoder's format and frame size
fn resample_graph(
    decoder: &codec::decoder::Audio,
    encoder: &codec::encoder::audio::Encoder,
    time_base: Rational,
) -> VideoHelperResult<filter::Graph> {
    let missing = |name: &str| DomainError::EncodeFailure(format!("Missing filter {}", name));
    let mut graph = filter::Graph::new();

    let args = format!(
        "time_base={}:sample_rate={}:sample_fmt={}:channel_layout=0x{:x}",
        time_base,
        decoder.rate(),
        decoder.format().name(),
        decoder.channel_layout().bits()
    );
    graph.add(&filter::find("abuffer").ok_or_else(|| missing("abuffer"))?, "in", &args)?;
    graph.add(
        &filter::find("abuffersink").ok_or_else(|| missing("abuffersink"))?,
        "out",
        "",
    )?;

    {
        let mut out = filter_context(&mut graph, "out")?;
        out.set_sample_format(encoder.format());
        out.set_channel_layout(encoder.channel_layout());
        out.set_sample_rate(encoder.rate());
    }

    graph.output("in", 0)?.input("out", 0)?.parse("anull")?;
    graph.validate()?;

    let fixed_frame_size = encoder
        .codec()
        .map(|codec| !codec.capabilities().contains(Capabilities::VARIABLE_FRAME_SIZE))
        .unwrap_or(true);
    if fixed_frame_size {
        filter_context(&mut graph, "out")?
            .sink()
            .set_frame_size(encoder.frame_size());
    }

    Ok(graph)
}

fn output_time_base(octx: &format::context::Output, index: usize) -> VideoHelperResult<Rational> {
    octx.stream(index)
        .map(|stream| stream.time_base())
        .ok_or_else(|| DomainError::EncodeFailure(format!("No output track {}", index)).into())
}

/// Transcode `input` into an MP4 at `output` following `strategy`
pub fn transcode(
    input: &Path,
    output: &Path,
    strategy: &FormatStrategy,
    events: &UnboundedSender<EncoderEvent>,
) -> VideoHelperResult<()> {
    let mut ictx = format::input(&input)?;
    let mut octx = format::output_as(&output, "mp4")?;

    let mut video = VideoPipeline::new(&ictx, &mut octx, strategy)?;
    let mut audio = AudioPipeline::new(&ictx, &mut octx, strategy)?;

    octx.write_header()?;

    let mut progress = ProgressReporter {
        events,
        total_micros: ictx.duration(),
        last_percent: -1,
    };

    for (stream, packet) in ictx.packets() {
        let index = stream.index();
        if index == video.ist_index {
            video.send_packet(&packet, &mut octx, &mut progress)?;
        } else if let Some(audio) = audio.as_mut().filter(|a| a.input_index() == index) {
            audio.send_packet(packet, &mut octx)?;
        }
    }

    video.finish(&mut octx, &mut progress)?;
    if let Some(audio) = audio.as_mut() {
        audio.finish(&mut octx)?;
    }
    octx.write_trailer()?;

    if progress.last_percent < 100 {
        let _ = events.send(EncoderEvent::Fraction(1.0));
    }
    Ok(())
}
