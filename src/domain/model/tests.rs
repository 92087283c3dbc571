// Unit tests for domain models

use super::*;
use std::path::PathBuf;

fn sample_info(width: u32, height: u32, rotation: u32) -> MediaInfo {
    MediaInfo::new(
        width,
        height,
        rotation,
        30.0,
        4_000_000,
        15_000_000,
        Some("video/avc".to_string()),
        Some("audio/mp4a-latm".to_string()),
    )
    .unwrap()
}

#[test]
fn test_orientation_portrait_without_rotation() {
    assert_eq!(
        Orientation::from_dimensions(1080, 1920, 0),
        Orientation::Portrait
    );
}

#[test]
fn test_orientation_flipped_by_quarter_turn() {
    assert_eq!(
        Orientation::from_dimensions(1080, 1920, 90),
        Orientation::Landscape
    );
    assert_eq!(
        Orientation::from_dimensions(1920, 1080, 270),
        Orientation::Portrait
    );
    // Half turn keeps the stored orientation
    assert_eq!(
        Orientation::from_dimensions(1920, 1080, 180),
        Orientation::Landscape
    );
}

#[test]
fn test_media_info_derives_orientation() {
    let info = sample_info(1080, 1920, 90);
    assert_eq!(info.orientation, Orientation::Landscape);
    assert_eq!(info.display_dimension(), Dimension::new(1920, 1080));
    assert_eq!(
        sample_info(1080, 1920, 180).display_dimension(),
        Dimension::new(1080, 1920)
    );
}

#[test]
fn test_media_info_rejects_odd_rotation() {
    let result = MediaInfo::new(640, 480, 45, 1.0, 0, 0, None, None);
    assert!(matches!(result, Err(DomainError::Probe(_))));
}

#[test]
fn test_media_info_rejects_negative_duration() {
    assert!(MediaInfo::new(640, 480, 0, -1.0, 0, 0, None, None).is_err());
    assert!(MediaInfo::new(640, 480, 0, f64::NAN, 0, 0, None, None).is_err());
}

#[test]
fn test_media_info_json_keys() {
    let info = sample_info(1920, 1080, 0);
    let json = serde_json::to_value(&info).unwrap();

    assert_eq!(json["width"], 1920);
    assert_eq!(json["rotationDegrees"], 0);
    assert_eq!(json["duration"], 30.0);
    assert_eq!(json["bitrate"], 4_000_000);
    assert_eq!(json["orientation"], "landscape");
    assert_eq!(json["size"], 15_000_000);
    assert_eq!(json["videoMediaType"], "video/avc");
    assert_eq!(json["audioMediaType"], "audio/mp4a-latm");
}

#[test]
fn test_dimension_even_rounds_down() {
    assert_eq!(Dimension::new(1281, 719).even(), Dimension::new(1280, 718));
    assert_eq!(Dimension::new(1, 1).even(), Dimension::new(2, 2));
    assert!(Dimension::default().is_unbounded());
    assert!(!Dimension::new(0, 720).is_unbounded());
}

#[test]
fn test_trim_window_empty() {
    assert!(TrimWindow::new(5, 5).is_empty());
    assert!(TrimWindow::new(10, 5).is_empty());
    assert!(!TrimWindow::new(0, 1).is_empty());
}

#[test]
fn test_trim_window_rebase_and_bounds() {
    let window = TrimWindow::new(2_000_000, 7_000_000);
    assert_eq!(window.rebase(2_500_000), 500_000);
    assert!(window.is_past_end(7_000_001));
    assert!(!window.is_past_end(7_000_000));
    assert_eq!(window.duration_micros(), 5_000_000);
    assert_eq!(TrimWindow::leading_seconds(1.5).end_micros, 1_500_000);
}

#[test]
fn test_track_mapping_sparse() {
    let mut mapping = TrackMapping::new(3);
    assert!(mapping.is_empty());

    mapping.map(0, 0);
    mapping.map(2, 1);
    mapping.map(9, 2); // out of range, ignored

    assert_eq!(mapping.destination(0), Some(0));
    assert_eq!(mapping.destination(1), None);
    assert_eq!(mapping.destination(2), Some(1));
    assert_eq!(mapping.destination(9), None);
    assert_eq!(mapping.selected_count(), 2);
}

#[test]
fn test_audio_setting_sentinel() {
    assert_eq!(AudioSetting::from_raw(-1), AudioSetting::AsIs);
    assert_eq!(AudioSetting::from_raw(128_000), AudioSetting::Value(128_000));
    assert_eq!(AudioSetting::AsIs.value_or(2), 2);
    assert_eq!(AudioSetting::Value(1).value_or(2), 1);
}

#[test]
fn test_encode_strategy_parse() {
    assert_eq!(
        "cli".parse::<EncodeStrategy>().unwrap(),
        EncodeStrategy::ExternalEncoderCli
    );
    assert_eq!(
        "Native".parse::<EncodeStrategy>().unwrap(),
        EncodeStrategy::NativeDemuxRemux
    );
    assert!("gpu".parse::<EncodeStrategy>().is_err());
    assert_eq!(EncodeStrategy::NativeDemuxRemux.to_string(), "native");
}

#[test]
fn test_transcode_options_builder() {
    let options = TranscodeOptions::new("/tmp/in.mp4", "clip")
        .with_dimension(0, 720)
        .with_video_bitrate_kbps(2500)
        .with_duration(10)
        .with_strategy(EncodeStrategy::NativeDemuxRemux);

    assert_eq!(options.desired, Dimension::new(0, 720));
    assert_eq!(options.video_bitrate_kbps, 2500);
    assert_eq!(options.requested_duration_secs, 10);
    assert_eq!(options.audio_bitrate, AudioSetting::AsIs);
    assert_eq!(options.source(), PathBuf::from("/tmp/in.mp4").as_path());
}

#[test]
fn test_format_strategy_defaults() {
    let strategy = FormatStrategy::from_options(&TranscodeOptions::new("in.mp4", "out"));
    assert_eq!(strategy.video_bitrate_bps, FormatStrategy::DEFAULT_VIDEO_BITRATE);
    assert_eq!(strategy.frame_rate, 30);

    let video = strategy.video_output(1920, 1080);
    assert_eq!(video.dimension, Dimension::new(1920, 1080));
    assert_eq!(video.key_frame_interval_secs, 3);
}

#[test]
fn test_format_strategy_audio_passthrough() {
    let strategy = FormatStrategy::from_options(&TranscodeOptions::new("in.mp4", "out"));
    assert_eq!(strategy.audio_output(true, 2, 48_000), None);

    let reencoded = strategy.audio_output(false, 2, 44_100).unwrap();
    assert_eq!(reencoded.bitrate_bps, 128_000);
    assert_eq!(reencoded.channels, 2);
    assert_eq!(reencoded.sample_rate, 44_100);
}

#[test]
fn test_format_strategy_audio_override() {
    let options = TranscodeOptions::new("in.mp4", "out")
        .with_audio(AudioSetting::Value(96_000), AudioSetting::Value(1));
    let strategy = FormatStrategy::from_options(&options);

    let audio = strategy.audio_output(true, 2, 48_000).unwrap();
    assert_eq!(audio.bitrate_bps, 96_000);
    assert_eq!(audio.channels, 1);
}

#[test]
fn test_progress_event_clamped() {
    assert_eq!(ProgressEvent::clamped(142.0).percent, 100.0);
    assert_eq!(ProgressEvent::clamped(-3.0).percent, 0.0);
    assert_eq!(ProgressEvent::clamped(f64::NAN).percent, 0.0);
    assert_eq!(ProgressEvent::clamped(42.5).percent, 42.5);
}

#[test]
fn test_terminal_outcome_from_error() {
    assert!(DomainError::EncodeCanceled.is_canceled());
    assert!(!DomainError::Probe("unreadable".to_string()).is_canceled());
    assert_eq!(
        TerminalOutcome::from(DomainError::EncodeCanceled),
        TerminalOutcome::Canceled
    );
    assert_eq!(
        TerminalOutcome::from(DomainError::EncodeFailure(
            "FFmpeg returned with error code: 1".to_string()
        )),
        TerminalOutcome::failed("FFmpeg returned with error code: 1")
    );
}

#[test]
fn test_response_completed() {
    let event = OperationEvent::Terminal(TerminalOutcome::Completed {
        output_path: PathBuf::from("/out/clip.mp4"),
    });
    let response = TranscodeResponse::from(&event);

    assert_eq!(response.progress, 100.0);
    assert!(response.completed);
    assert!(!response.error);
    assert_eq!(response.message.as_deref(), Some("Completed!"));
    assert_eq!(response.data.as_deref(), Some("/out/clip.mp4"));
    assert!(!response.keep_callback());
}

#[test]
fn test_response_canceled_and_failed() {
    let canceled = TranscodeResponse::from(&OperationEvent::Terminal(TerminalOutcome::Canceled));
    assert!(canceled.error);
    assert!(!canceled.completed);
    assert_eq!(canceled.message.as_deref(), Some("Transcode canceled!"));

    let failed = TranscodeResponse::from(&OperationEvent::Terminal(TerminalOutcome::failed(
        "boom",
    )));
    assert!(failed.error);
    assert_eq!(failed.message.as_deref(), Some("boom"));
    assert_eq!(failed.data, None);
}

#[test]
fn test_response_progress_keeps_callback() {
    let response =
        TranscodeResponse::from(&OperationEvent::Progress(ProgressEvent::clamped(37.0)));
    assert_eq!(response.progress, 37.0);
    assert!(!response.completed);
    assert!(!response.error);
    assert!(response.keep_callback());

    let json = serde_json::to_string(&response).unwrap();
    assert!(!json.contains("message"));
    assert!(!json.contains("data"));
}
