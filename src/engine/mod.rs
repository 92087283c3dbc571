//! Core media engine: segment remuxing, encoder commands and progress

pub mod command;
pub mod progress;
pub mod remux;

pub use command::{CodecChoice, CommandBuilder, TranscodeCommand};
pub use progress::{parse_progress, ProgressGate, ProgressMonitor};
pub use remux::TrackDemuxRemuxer;
