//! FFprobe adapter for media file probing
//!
//! Runs `ffprobe` with JSON output and maps the first real video stream plus the
//! container section onto [`MediaInfo`].

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::MetadataRules;
use crate::ports::*;

const PROBE_FAILURE: &str = "Failed to retrieve video metadata";

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    #[serde(default)]
    disposition: HashMap<String, i64>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

impl ProbeStream {
    fn is_type(&self, kind: &str) -> bool {
        self.codec_type.as_deref() == Some(kind)
    }

    fn is_cover_art(&self) -> bool {
        self.disposition.get("attached_pic").copied().unwrap_or(0) != 0
    }

    // Clockwise degrees: the `rotate` tag is clockwise, display-matrix rotation counter-clockwise
    fn rotation(&self) -> u32 {
        if let Some(tag) = self.tags.get("rotate").and_then(|v| v.trim().parse::<f64>().ok()) {
            return MetadataRules::normalize_rotation(tag);
        }
        self.side_data_list
            .iter()
            .find_map(|side| side.rotation)
            .map(|rotation| MetadataRules::normalize_rotation(-rotation))
            .unwrap_or(0)
    }
}

fn parse_number<T: std::str::FromStr>(value: Option<&String>) -> Option<T> {
    value.and_then(|v| v.trim().parse::<T>().ok())
}

fn probe_error(detail: impl std::fmt::Display) -> DomainError {
    DomainError::Probe(format!("{}: {}", PROBE_FAILURE, detail))
}

/// Map ffprobe JSON onto media info; `file_size` overrides the container's size field
pub fn parse_probe_output(output: &str, file_size: Option<u64>) -> Result<MediaInfo, DomainError> {
    let probe: ProbeOutput = serde_json::from_str(output)
        .map_err(|e| probe_error(format!("unreadable ffprobe output ({})", e)))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.is_type("video") && !s.is_cover_art())
        .ok_or_else(|| probe_error("no video track"))?;
    let audio = probe.streams.iter().find(|s| s.is_type("audio"));

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(probe_error("missing width or height")),
    };

    let container_duration = probe
        .format
        .as_ref()
        .and_then(|f| parse_number::<f64>(f.duration.as_ref()));
    let duration = container_duration
        .or_else(|| {
            probe
                .streams
                .iter()
                .filter_map(|s| parse_number::<f64>(s.duration.as_ref()))
                .reduce(f64::max)
        })
        .ok_or_else(|| probe_error("missing duration"))?;

    let bitrate = probe
        .format
        .as_ref()
        .and_then(|f| parse_number::<u64>(f.bit_rate.as_ref()))
        .unwrap_or(0);
    let size = file_size
        .or_else(|| {
            probe
                .format
                .as_ref()
                .and_then(|f| parse_number::<u64>(f.size.as_ref()))
        })
        .unwrap_or(0);

    MediaInfo::new(
        width,
        height,
        video.rotation(),
        duration,
        bitrate,
        size,
        video
            .codec_name
            .as_deref()
            .map(MetadataRules::video_mime_for_codec),
        audio
            .and_then(|a| a.codec_name.as_deref())
            .map(MetadataRules::audio_mime_for_codec),
    )
    .map_err(|e| probe_error(e))
}

/// FFprobe-based probe adapter
pub struct FFprobeAdapter {
    ffprobe_path: String,
}

impl FFprobeAdapter {
    /// Create new FFprobe adapter
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

#[async_trait]
impl ProbePort for FFprobeAdapter {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, DomainError> {
        debug!(path = %path.display(), "Probing media");

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| probe_error(format!("cannot run {} ({})", self.ffprobe_path, e)))?;

        if !output.status.success() {
            return Err(probe_error(format!(
                "ffprobe exited with {:?} for {}",
                output.status.code(),
                path.display()
            )));
        }

        let file_size = tokio::fs::metadata(path).await.ok().map(|meta| meta.len());
        parse_probe_output(&String::from_utf8_lossy(&output.stdout), file_size)
    }
}
