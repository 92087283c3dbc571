// Domain rules - Business logic and policies

use crate::domain::model::*;

/// Aspect-preserving output size computation
pub struct DimensionCalculator;

impl DimensionCalculator {
    /// Compute the output size for a source under a desired bound.
    ///
    /// With both sides given, the longer desired side bounds the longer source
    /// side (ties treat width as longer). With only one side given, that side
    /// is the bound. A zero bound, or a source already within the bound, returns
    /// the input unchanged; the calculator never upscales.
    pub fn compute_output_dimension(
        in_width: u32,
        in_height: u32,
        desired_width: u32,
        desired_height: u32,
    ) -> Dimension {
        let unchanged = Dimension::new(in_width, in_height);
        if in_width == 0 || in_height == 0 {
            return unchanged;
        }

        match (desired_width, desired_height) {
            (0, 0) => unchanged,
            (bound, 0) if in_width > bound => {
                Dimension::new(bound, Self::scale_side(in_height, in_width, bound))
            }
            (0, bound) if in_height > bound => {
                Dimension::new(Self::scale_side(in_width, in_height, bound), bound)
            }
            (_, 0) | (0, _) => unchanged,
            (desired_width, desired_height) => {
                let out_longer = desired_width.max(desired_height);
                let width_is_longer = in_width >= in_height;
                let (in_longer, in_shorter) = if width_is_longer {
                    (in_width, in_height)
                } else {
                    (in_height, in_width)
                };

                if in_longer <= out_longer {
                    return unchanged;
                }

                let scaled_shorter = Self::scale_side(in_shorter, in_longer, out_longer);
                if width_is_longer {
                    Dimension::new(out_longer, scaled_shorter)
                } else {
                    Dimension::new(scaled_shorter, out_longer)
                }
            }
        }
    }

    // other * bound / bounded, keeping the aspect ratio
    fn scale_side(other: u32, bounded: u32, bound: u32) -> u32 {
        let aspect_ratio = bounded as f64 / other as f64;
        ((bound as f64 / aspect_ratio).round() as u32).max(1)
    }

    /// Effective orientation for stored dimensions plus a rotation hint
    pub fn get_orientation(width: u32, height: u32, rotation_degrees: u32) -> Orientation {
        Orientation::from_dimensions(width, height, rotation_degrees)
    }
}

/// Trim decisions made between probing and encoding
pub struct TrimPolicy;

impl TrimPolicy {
    /// Requested duration, or the full source when none was requested
    pub fn effective_duration(requested_secs: u64, source_secs: f64) -> f64 {
        if requested_secs == 0 {
            source_secs
        } else {
            requested_secs as f64
        }
    }

    /// True when the effective window is strictly shorter than the source
    pub fn window_is_partial(requested_secs: u64, source_secs: f64) -> bool {
        requested_secs > 0 && (requested_secs as f64) < source_secs
    }

    /// Whether a separate lossless pre-trim pass runs before encoding.
    ///
    /// The CLI strategy folds the bound into the command's duration argument, so
    /// only the native engine ever needs a trimmed intermediate file.
    pub fn needs_pre_trim(options: &TranscodeOptions, info: &MediaInfo) -> bool {
        options.strategy == EncodeStrategy::NativeDemuxRemux
            && Self::window_is_partial(options.requested_duration_secs, info.duration_seconds)
    }

    /// Window covering the leading `effective_secs` of the source
    pub fn leading_window(effective_secs: f64) -> TrimWindow {
        TrimWindow::leading_seconds(effective_secs)
    }

    /// Duration the CLI progress parser divides by
    pub fn progress_total(effective_secs: f64, source_secs: f64) -> f64 {
        if source_secs > 0.0 {
            effective_secs.min(source_secs)
        } else {
            effective_secs
        }
    }
}

/// Container metadata normalisation
pub struct MetadataRules;

impl MetadataRules {
    /// Snap an arbitrary rotation (possibly negative, e.g. display-matrix -90) to {0,90,180,270}
    pub fn normalize_rotation(raw_degrees: f64) -> u32 {
        if !raw_degrees.is_finite() {
            return 0;
        }
        let quarter_turns = (raw_degrees / 90.0).round() as i64;
        (quarter_turns.rem_euclid(4) * 90) as u32
    }

    /// MIME type for a video codec name as reported by the probe
    pub fn video_mime_for_codec(codec: &str) -> String {
        let mime = match codec {
            "h264" => "video/avc",
            "hevc" | "h265" => "video/hevc",
            "mpeg4" => "video/mp4v-es",
            "h263" => "video/3gpp",
            "vp8" => "video/x-vnd.on2.vp8",
            "vp9" => "video/x-vnd.on2.vp9",
            "av1" => "video/av01",
            "mjpeg" | "png" | "bmp" | "gif" => return format!("image/{}", codec),
            other => return format!("video/{}", other),
        };
        mime.to_string()
    }

    /// MIME type for an audio codec name as reported by the probe
    pub fn audio_mime_for_codec(codec: &str) -> String {
        let mime = match codec {
            "aac" => "audio/mp4a-latm",
            "mp3" => "audio/mpeg",
            "opus" => "audio/opus",
            "vorbis" => "audio/vorbis",
            "flac" => "audio/flac",
            "amr_nb" => "audio/3gpp",
            "amr_wb" => "audio/amr-wb",
            "ac3" => "audio/ac3",
            "eac3" => "audio/eac3",
            other => return format!("audio/{}", other),
        };
        mime.to_string()
    }

    /// Tracks the remuxer copies: anything declared as video or audio
    pub fn is_remuxable_mime(mime: &str) -> bool {
        mime.starts_with("video/") || mime.starts_with("audio/")
    }
}

/// Thumbnail sizing policy
pub struct ThumbnailRules;

impl ThumbnailRules {
    /// Scale filter for the bound: one side given keeps the aspect ratio, none disables scaling
    pub fn scale_filter(desired: Dimension) -> Option<String> {
        match (desired.width, desired.height) {
            (0, 0) => None,
            (width, 0) => Some(format!("scale={}:-2", width)),
            (0, height) => Some(format!("scale=-2:{}", height)),
            (width, height) => Some(format!("scale={}:{}", width, height)),
        }
    }
}
