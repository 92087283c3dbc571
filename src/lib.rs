//! Video helper library
//!
//! Transcode, trim and thumbnail primitives for a host application: lossless
//! segment extraction, aspect-preserving output sizing, external or in-process
//! encoder sequencing, and a gated progress stream ending in exactly one outcome.
//!
//! # Usage
//!
//! ```bash
//! videohelper transcode -i "clip.mov" --height 720 --duration 30
//! videohelper trim -i "clip.mov" --duration 00:00:10
//! videohelper thumbnail -i "clip.mov" --at 3 --width 320
//! videohelper info -i "clip.mov"
//! ```

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::VideoHelper;
pub use config::AppConfig;
pub use domain::errors::DomainError;
pub use domain::model::{
    MediaInfo, OperationEvent, TerminalOutcome, TranscodeOptions, TranscodeResponse,
};
pub use error::{VideoHelperError, VideoHelperResult};
