//! Argument lists for the external command-line transcoder
//!
//! Pure mapping from options to arguments. Argument order matters to the tool and
//! is fixed: input, duration, audio codec, video codec, quality, preset, bitrate,
//! resolution, frame rate, output.

use std::path::Path;

use crate::domain::model::Dimension;
use crate::domain::rules::ThumbnailRules;
use crate::utils::time::seconds_arg;
use crate::utils::PathUtils;

/// Constant rate factor passed to every transcode
pub const QUALITY_CRF: u32 = 28;
/// Encoder speed preset
pub const SPEED_PRESET: &str = "superfast";
/// Output frame rate
pub const DEFAULT_FRAME_RATE: u32 = 24;
/// Bitrate used when the caller asks for 0 kbps
pub const DEFAULT_VIDEO_BITRATE_KBPS: u32 = 9000;
/// JPEG quality scale for thumbnails (2 best, 31 worst)
pub const THUMBNAIL_QUALITY: u32 = 4;

/// Codec pair chosen from the output file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecChoice {
    pub video: &'static str,
    pub audio: &'static str,
}

/// Used for any extension the table does not know
pub const FALLBACK_CODECS: CodecChoice = CodecChoice {
    video: "mpeg4",
    audio: "libmp3lame",
};

/// Semantic inputs of one transcode command
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeCommand<'a> {
    pub source: &'a Path,
    pub output: &'a Path,
    /// 0 substitutes `default_duration_secs`
    pub duration_secs: u64,
    pub default_duration_secs: f64,
    pub video_bitrate_kbps: u32,
    pub resolution: Dimension,
}

/// Builder for transcoder argument lists
#[derive(Debug, Clone, Default)]
pub struct CommandBuilder;

impl CommandBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Codec pair for an output path's extension
    pub fn codecs_for(&self, output: &Path) -> CodecChoice {
        let extension = PathUtils::new().get_extension(output).unwrap_or_default();

        match extension.as_str() {
            "mp4" | "m4v" | "mov" | "mkv" | "3gp" => CodecChoice {
                video: "libx264",
                audio: "aac",
            },
            "webm" => CodecChoice {
                video: "libvpx-vp9",
                audio: "libopus",
            },
            "avi" => CodecChoice {
                video: "mpeg4",
                audio: "libmp3lame",
            },
            _ => FALLBACK_CODECS,
        }
    }

    /// Full re-encode of the leading `duration` of a source
    pub fn transcode_command(&self, command: &TranscodeCommand<'_>) -> Vec<String> {
        let duration = if command.duration_secs == 0 {
            seconds_arg(command.default_duration_secs)
        } else {
            command.duration_secs.to_string()
        };
        let bitrate_kbps = match command.video_bitrate_kbps {
            0 => DEFAULT_VIDEO_BITRATE_KBPS,
            kbps => kbps,
        };
        let codecs = self.codecs_for(command.output);
        let resolution = command.resolution.even();

        vec![
            "-i".to_string(),
            command.source.to_string_lossy().to_string(),
            "-t".to_string(),
            duration,
            "-c:a".to_string(),
            codecs.audio.to_string(),
            "-c:v".to_string(),
            codecs.video.to_string(),
            "-crf".to_string(),
            QUALITY_CRF.to_string(),
            "-preset".to_string(),
            SPEED_PRESET.to_string(),
            "-b:v".to_string(),
            format!("{}k", bitrate_kbps),
            "-s".to_string(),
            resolution.to_string(),
            "-r".to_string(),
            DEFAULT_FRAME_RATE.to_string(),
            command.output.to_string_lossy().to_string(),
        ]
    }

    /// Stream-copy trim: no re-encode, start offset and duration only
    pub fn lossless_trim_command(
        &self,
        source: &Path,
        output: &Path,
        start_secs: f64,
        duration_secs: f64,
    ) -> Vec<String> {
        vec![
            "-ss".to_string(),
            seconds_arg(start_secs),
            "-t".to_string(),
            seconds_arg(duration_secs),
            "-i".to_string(),
            source.to_string_lossy().to_string(),
            "-c:a".to_string(),
            "copy".to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Single JPEG frame at `at_secs`, optionally scaled to the bound
    pub fn thumbnail_command(
        &self,
        source: &Path,
        output: &Path,
        at_secs: u64,
        desired: Dimension,
    ) -> Vec<String> {
        let mut args = vec![
            "-ss".to_string(),
            at_secs.to_string(),
            "-i".to_string(),
            source.to_string_lossy().to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
        ];

        if let Some(filter) = ThumbnailRules::scale_filter(desired) {
            args.push("-vf".to_string());
            args.push(filter);
        }

        args.push("-q:v".to_string());
        args.push(THUMBNAIL_QUALITY.to_string());
        args.push(output.to_string_lossy().to_string());
        args
    }
}
