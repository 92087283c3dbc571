//! CLI module for videohelper
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::model::EncodeStrategy;

pub mod args;
pub mod commands;

pub use args::{InfoArgs, ThumbnailArgs, TranscodeArgs, TrimArgs};

/// Video helper
///
/// Transcode, trim and thumbnail videos, printing one JSON response per line.
#[derive(Parser, Debug)]
#[command(name = "videohelper")]
#[command(about = "Video transcode, trim and thumbnail helper")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./videohelper.toml, then the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory receiving outputs and temporaries
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// ffmpeg binary
    #[arg(long, global = true)]
    pub ffmpeg: Option<String>,

    /// ffprobe binary
    #[arg(long, global = true)]
    pub ffprobe: Option<String>,

    /// Concurrent operations (0: one per CPU)
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Encoder engine: cli or native
    #[arg(long, global = true)]
    pub strategy: Option<EncodeStrategy>,

    /// Logging level or filter directive
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcode a video to MP4
    Transcode(TranscodeArgs),
    /// Losslessly keep the leading part of a video
    Trim(TrimArgs),
    /// Capture one frame as JPEG
    Thumbnail(ThumbnailArgs),
    /// Print media metadata as JSON
    Info(InfoArgs),
}
