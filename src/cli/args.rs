//! Command-line argument definitions

use clap::Args;

use crate::utils::TimeParser;

/// Whole seconds from `SS`, `MM:SS` or `HH:MM:SS` (fractions round to nearest)
pub fn parse_whole_seconds(value: &str) -> Result<u64, String> {
    TimeParser::new()
        .parse_time(value)
        .map(|seconds| seconds.round() as u64)
        .map_err(|e| e.to_string())
}

/// Source and output naming shared by every producing command
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Input video path or file:// URL (percent-encoding allowed)
    #[arg(short, long)]
    pub input: String,

    /// Output base name (default: local timestamp)
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Output bound; 0 leaves a side unconstrained
#[derive(Args, Debug, Clone, Default)]
pub struct BoundArgs {
    /// Maximum output width
    #[arg(long, default_value_t = 0)]
    pub width: u32,

    /// Maximum output height
    #[arg(long, default_value_t = 0)]
    pub height: u32,
}

/// Arguments for the transcode command
#[derive(Args, Debug)]
pub struct TranscodeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub bound: BoundArgs,

    /// Video bitrate in kbps (0: engine default)
    #[arg(long, default_value_t = 0)]
    pub bitrate: u32,

    /// Audio bitrate in bps (-1: as-is)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub audio_bitrate: i64,

    /// Audio channel count (-1: as-is)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub audio_channels: i64,

    /// Keep only the leading duration (seconds, MM:SS or HH:MM:SS; 0: full source)
    #[arg(short, long, value_parser = parse_whole_seconds, default_value = "0")]
    pub duration: u64,
}

/// Arguments for the trim command
#[derive(Args, Debug)]
pub struct TrimArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Leading duration to keep (seconds, MM:SS or HH:MM:SS; 0: full source)
    #[arg(short, long, value_parser = parse_whole_seconds, default_value = "0")]
    pub duration: u64,
}

/// Arguments for the thumbnail command
#[derive(Args, Debug)]
pub struct ThumbnailArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub bound: BoundArgs,

    /// Position of the captured frame
    #[arg(short = 't', long = "at", value_parser = parse_whole_seconds, default_value = "0")]
    pub at: u64,
}

/// Arguments for the info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Input video path or file:// URL
    #[arg(short, long)]
    pub input: String,

    /// Pretty-print the JSON
    #[arg(long)]
    pub pretty: bool,
}
