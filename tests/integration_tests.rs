//! Integration tests for the operation flows, driven through mock ports

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_cmd::Command;
use async_trait::async_trait;
use predicates::prelude::*;
use tempfile::TempDir;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use video_helper::app::transcode_interactor::OUTPUT_MISSING;
use video_helper::app::trim_interactor::TRIM_FAILED;
use video_helper::app::{HelperPorts, VideoHelper};
use video_helper::config::AppConfig;
use video_helper::domain::errors::DomainError;
use video_helper::domain::model::*;
use video_helper::ports::{EncodeJob, EncoderEvent, EncoderExit, EncoderPort, ProbePort, SegmentPort};

// Mock ports

struct MockProbe {
    result: Result<MediaInfo, DomainError>,
    calls: AtomicUsize,
}

#[async_trait]
impl ProbePort for MockProbe {
    async fn probe(&self, _path: &Path) -> Result<MediaInfo, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Replays a script from a background thread, optionally writing the job's output first
struct MockEncoder {
    script: Vec<EncoderEvent>,
    writes_output: bool,
    jobs: Mutex<Vec<EncodeJob>>,
}

impl MockEncoder {
    fn new(script: Vec<EncoderEvent>, writes_output: bool) -> Arc<Self> {
        Arc::new(Self {
            script,
            writes_output,
            jobs: Mutex::new(Vec::new()),
        })
    }

    fn jobs(&self) -> Vec<EncodeJob> {
        self.jobs.lock().unwrap().clone()
    }
}

fn job_output(job: &EncodeJob) -> PathBuf {
    match job {
        EncodeJob::Command { args, .. } => PathBuf::from(args.last().cloned().unwrap_or_default()),
        EncodeJob::Structured { output, .. } => output.clone(),
    }
}

impl EncoderPort for MockEncoder {
    fn launch(&self, job: EncodeJob, events: UnboundedSender<EncoderEvent>) -> Result<(), DomainError> {
        let output = job_output(&job);
        self.jobs.lock().unwrap().push(job);
        let script = self.script.clone();
        let writes_output = self.writes_output;

        std::thread::spawn(move || {
            for event in script {
                if writes_output && matches!(event, EncoderEvent::Exit(_)) {
                    std::fs::write(&output, b"encoded").unwrap();
                }
                std::thread::sleep(Duration::from_millis(2));
                let _ = events.send(event);
            }
        });
        Ok(())
    }
}

enum SegmentBehavior {
    Produce,
    Empty,
    Fail,
    /// Creates the destination, then fails before writing it
    FailAfterCreate,
}

struct MockSegments {
    behavior: SegmentBehavior,
    windows: Mutex<Vec<(PathBuf, TrimWindow)>>,
}

impl MockSegments {
    fn new(behavior: SegmentBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            windows: Mutex::new(Vec::new()),
        })
    }
}

impl SegmentPort for MockSegments {
    fn extract_segment(
        &self,
        _source: &Path,
        output: &Path,
        window: TrimWindow,
        _rotation_degrees: u32,
    ) -> Result<bool, DomainError> {
        self.windows.lock().unwrap().push((output.to_path_buf(), window));
        match self.behavior {
            SegmentBehavior::Produce => {
                std::fs::write(output, b"segment")?;
                Ok(true)
            }
            SegmentBehavior::Empty => Ok(false),
            SegmentBehavior::Fail => Err(DomainError::RemuxFailure("no tracks".to_string())),
            SegmentBehavior::FailAfterCreate => {
                std::fs::write(output, b"")?;
                Err(DomainError::RemuxFailure("Failed to write header".to_string()))
            }
        }
    }
}

// Fixture

struct Fixture {
    _dir: TempDir,
    output_dir: PathBuf,
    source: PathBuf,
    probe: Arc<MockProbe>,
    cli: Arc<MockEncoder>,
    native: Arc<MockEncoder>,
    segments: Arc<MockSegments>,
    helper: VideoHelper,
}

fn thirty_second_clip() -> MediaInfo {
    MediaInfo::new(
        1920,
        1080,
        0,
        30.0,
        8_000_000,
        30_000_000,
        Some("video/avc".to_string()),
        Some("audio/mp4a-latm".to_string()),
    )
    .unwrap()
}

fn fixture(
    probe: Result<MediaInfo, DomainError>,
    cli: Arc<MockEncoder>,
    native: Arc<MockEncoder>,
    segments: Arc<MockSegments>,
) -> Fixture {
    let dir = TempDir::new().unwrap();
    let output_dir = dir.path().join("videos");
    let source = dir.path().join("source.mov");
    std::fs::write(&source, b"source").unwrap();

    let probe = Arc::new(MockProbe {
        result: probe,
        calls: AtomicUsize::new(0),
    });
    let config = AppConfig {
        output_dir: output_dir.clone(),
        max_workers: 2,
        ..AppConfig::default()
    };
    let helper = VideoHelper::with_ports(
        config,
        HelperPorts {
            probe: Arc::clone(&probe) as Arc<dyn ProbePort>,
            cli_encoder: Arc::clone(&cli) as Arc<dyn EncoderPort>,
            native_encoder: Arc::clone(&native) as Arc<dyn EncoderPort>,
            segments: Arc::clone(&segments) as Arc<dyn SegmentPort>,
        },
    );

    Fixture {
        _dir: dir,
        output_dir,
        source,
        probe,
        cli,
        native,
        segments,
        helper,
    }
}

fn succeeding(script: Vec<EncoderEvent>) -> Arc<MockEncoder> {
    let mut script = script;
    script.push(EncoderEvent::Exit(EncoderExit::Success));
    MockEncoder::new(script, true)
}

fn idle() -> Arc<MockEncoder> {
    MockEncoder::new(vec![], false)
}

async fn collect(mut stream: UnboundedReceiver<OperationEvent>) -> Vec<OperationEvent> {
    let mut events = Vec::new();
    while let Some(event) = tokio::time::timeout(Duration::from_secs(10), stream.recv())
        .await
        .expect("operation never settled")
    {
        events.push(event);
    }
    events
}

fn terminal(events: &[OperationEvent]) -> TerminalOutcome {
    let terminals: Vec<&OperationEvent> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminals.len(), 1, "exactly one terminal outcome");
    assert!(events.last().unwrap().is_terminal(), "terminal outcome comes last");
    match terminals[0] {
        OperationEvent::Terminal(outcome) => outcome.clone(),
        OperationEvent::Progress(_) => unreachable!(),
    }
}

fn percents(events: &[OperationEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            OperationEvent::Progress(p) => Some(p.percent),
            OperationEvent::Terminal(_) => None,
        })
        .collect()
}

// Transcode

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_full_source_folds_duration_into_command() {
    let cli = succeeding(vec![
        EncoderEvent::LogLine("frame=1 time=00:00:15.00 bitrate=1k".to_string()),
        EncoderEvent::LogLine("Stream mapping:".to_string()),
        EncoderEvent::LogLine("frame=2 time=00:00:36.00 bitrate=1k".to_string()),
    ]);
    let f = fixture(Ok(thirty_second_clip()), cli, idle(), MockSegments::new(SegmentBehavior::Produce));

    let options = TranscodeOptions::new(&f.source, "clip").with_dimension(0, 720);
    let events = collect(f.helper.transcode(options)).await;

    assert_eq!(percents(&events), vec![50.0, 100.0]);
    assert_eq!(
        terminal(&events),
        TerminalOutcome::Completed {
            output_path: f.output_dir.join("clip.mp4")
        }
    );

    let jobs = f.cli.jobs();
    let EncodeJob::Command { args, total_duration_secs } = &jobs[0] else {
        panic!("expected a command job");
    };
    assert_eq!(*total_duration_secs, 30.0);
    let duration_at = args.iter().position(|a| a == "-t").unwrap();
    assert_eq!(args[duration_at + 1], "30");
    let size_at = args.iter().position(|a| a == "-s").unwrap();
    assert_eq!(args[size_at + 1], "1280x720");

    assert!(f.segments.windows.lock().unwrap().is_empty());
    assert!(!f.output_dir.join("trim-clip.mp4").exists());
    assert_eq!(f.probe.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_uses_displayed_size_for_rotated_sources() {
    let rotated = MediaInfo::new(1920, 1080, 90, 10.0, 0, 0, None, None).unwrap();
    let f = fixture(Ok(rotated), succeeding(vec![]), idle(), MockSegments::new(SegmentBehavior::Produce));

    let options = TranscodeOptions::new(&f.source, "portrait").with_dimension(0, 960);
    let events = collect(f.helper.transcode(options)).await;
    assert!(!terminal(&events).is_error());

    let EncodeJob::Command { args, .. } = &f.cli.jobs()[0] else {
        panic!("expected a command job");
    };
    let size_at = args.iter().position(|a| a == "-s").unwrap();
    assert_eq!(args[size_at + 1], "540x960");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_native_partial_window_pre_trims_then_cleans_up() {
    let native = succeeding(vec![EncoderEvent::Fraction(0.25), EncoderEvent::Fraction(0.75)]);
    let f = fixture(Ok(thirty_second_clip()), idle(), native, MockSegments::new(SegmentBehavior::Produce));

    let options = TranscodeOptions::new(&f.source, "short")
        .with_strategy(EncodeStrategy::NativeDemuxRemux)
        .with_duration(10);
    let events = collect(f.helper.transcode(options)).await;

    assert_eq!(percents(&events), vec![25.0, 75.0]);
    assert!(!terminal(&events).is_error());

    let pre_trim = f.output_dir.join("trim-short.mp4");
    assert_eq!(
        *f.segments.windows.lock().unwrap(),
        vec![(pre_trim.clone(), TrimWindow::new(0, 10_000_000))]
    );
    let EncodeJob::Structured { input, output, .. } = &f.native.jobs()[0] else {
        panic!("expected a structured job");
    };
    assert_eq!(input, &pre_trim);
    assert_eq!(output, &f.output_dir.join("short.mp4"));
    assert!(!pre_trim.exists());
    assert!(f.cli.jobs().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_native_full_source_skips_pre_trim() {
    let f = fixture(
        Ok(thirty_second_clip()),
        idle(),
        succeeding(vec![]),
        MockSegments::new(SegmentBehavior::Produce),
    );
    let options = TranscodeOptions::new(&f.source, "whole").with_strategy(EncodeStrategy::NativeDemuxRemux);
    let events = collect(f.helper.transcode(options)).await;

    assert!(!terminal(&events).is_error());
    assert!(f.segments.windows.lock().unwrap().is_empty());
    let EncodeJob::Structured { input, .. } = &f.native.jobs()[0] else {
        panic!("expected a structured job");
    };
    assert_eq!(input, &f.source);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_pre_trim_degrades_to_full_source() {
    for behavior in [SegmentBehavior::Fail, SegmentBehavior::Empty] {
        let f = fixture(Ok(thirty_second_clip()), idle(), succeeding(vec![]), MockSegments::new(behavior));
        let options = TranscodeOptions::new(&f.source, "degraded")
            .with_strategy(EncodeStrategy::NativeDemuxRemux)
            .with_duration(5);
        let events = collect(f.helper.transcode(options)).await;

        assert!(!terminal(&events).is_error());
        let EncodeJob::Structured { input, .. } = &f.native.jobs()[0] else {
            panic!("expected a structured job");
        };
        assert_eq!(input, &f.source);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_canceled_encode_is_distinct_from_failure() {
    let cli = MockEncoder::new(vec![EncoderEvent::Exit(EncoderExit::Canceled)], false);
    let f = fixture(Ok(thirty_second_clip()), cli, idle(), MockSegments::new(SegmentBehavior::Produce));

    let events = collect(f.helper.transcode(TranscodeOptions::new(&f.source, "c"))).await;
    assert_eq!(terminal(&events), TerminalOutcome::Canceled);

    let response = TranscodeResponse::from(events.last().unwrap());
    assert!(response.error);
    assert!(!response.completed);
    assert_eq!(response.message.as_deref(), Some("Transcode canceled!"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_encoder_failure_surfaces_message() {
    let message = "FFmpeg returned with error code: 1";
    let cli = MockEncoder::new(vec![EncoderEvent::Exit(EncoderExit::Failed(message.to_string()))], false);
    let f = fixture(Ok(thirty_second_clip()), cli, idle(), MockSegments::new(SegmentBehavior::Produce));

    let events = collect(f.helper.transcode(TranscodeOptions::new(&f.source, "x"))).await;
    assert_eq!(terminal(&events), TerminalOutcome::failed(message));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_success_without_output_is_failure() {
    let cli = MockEncoder::new(vec![EncoderEvent::Exit(EncoderExit::Success)], false);
    let f = fixture(Ok(thirty_second_clip()), cli, idle(), MockSegments::new(SegmentBehavior::Produce));

    let events = collect(f.helper.transcode(TranscodeOptions::new(&f.source, "ghost"))).await;
    assert_eq!(terminal(&events), TerminalOutcome::failed(OUTPUT_MISSING));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_probe_failure_aborts_before_encoding() {
    let probe_error = DomainError::Probe("Failed to retrieve video metadata: no video track".to_string());
    let f = fixture(Err(probe_error.clone()), succeeding(vec![]), idle(), MockSegments::new(SegmentBehavior::Produce));

    let events = collect(f.helper.transcode(TranscodeOptions::new(&f.source, "p"))).await;
    assert_eq!(terminal(&events), TerminalOutcome::failed(probe_error.to_string()));
    assert!(f.cli.jobs().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_progress_after_terminal_outcome() {
    let cli = MockEncoder::new(
        vec![
            EncoderEvent::Fraction(0.9),
            EncoderEvent::Fraction(0.2),
            EncoderEvent::Exit(EncoderExit::Success),
            EncoderEvent::Fraction(1.5),
            EncoderEvent::LogLine("time=00:00:29.00".to_string()),
        ],
        true,
    );
    let f = fixture(Ok(thirty_second_clip()), cli, idle(), MockSegments::new(SegmentBehavior::Produce));

    let events = collect(f.helper.transcode(TranscodeOptions::new(&f.source, "late"))).await;
    assert_eq!(percents(&events), vec![90.0, 20.0]);
    assert!(!terminal(&events).is_error());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unwritable_output_dir_is_io_failure() {
    let f = fixture(Ok(thirty_second_clip()), succeeding(vec![]), idle(), MockSegments::new(SegmentBehavior::Produce));
    std::fs::write(&f.output_dir, b"not a directory").unwrap();

    let events = collect(f.helper.transcode(TranscodeOptions::new(&f.source, "io"))).await;
    assert_eq!(
        terminal(&events),
        TerminalOutcome::failed("Can't access or make videos directory")
    );
    assert_eq!(f.probe.calls.load(Ordering::SeqCst), 0);
}

// Trim, thumbnail, info

#[tokio::test(flavor = "multi_thread")]
async fn test_native_trim_results() {
    let f = fixture(Ok(thirty_second_clip()), idle(), idle(), MockSegments::new(SegmentBehavior::Produce));
    let options = TranscodeOptions::new(&f.source, "cut")
        .with_strategy(EncodeStrategy::NativeDemuxRemux)
        .with_duration(12);
    let events = collect(f.helper.trim(options)).await;
    assert_eq!(
        terminal(&events),
        TerminalOutcome::Completed {
            output_path: f.output_dir.join("trimmed-cut.mp4")
        }
    );
    assert_eq!(f.segments.windows.lock().unwrap()[0].1, TrimWindow::new(0, 12_000_000));

    let f = fixture(Ok(thirty_second_clip()), idle(), idle(), MockSegments::new(SegmentBehavior::Empty));
    let options = TranscodeOptions::new(&f.source, "cut").with_strategy(EncodeStrategy::NativeDemuxRemux);
    let events = collect(f.helper.trim(options)).await;
    assert_eq!(terminal(&events), TerminalOutcome::failed(TRIM_FAILED));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_native_trim_leaves_no_output() {
    for behavior in [SegmentBehavior::FailAfterCreate, SegmentBehavior::Empty] {
        let f = fixture(Ok(thirty_second_clip()), idle(), idle(), MockSegments::new(behavior));
        let options = TranscodeOptions::new(&f.source, "broken")
            .with_strategy(EncodeStrategy::NativeDemuxRemux)
            .with_duration(5);
        let events = collect(f.helper.trim(options)).await;

        assert_eq!(terminal(&events), TerminalOutcome::failed(TRIM_FAILED));
        assert!(!f.output_dir.join("trimmed-broken.mp4").exists());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_trim_runs_stream_copy() {
    let f = fixture(Ok(thirty_second_clip()), succeeding(vec![]), idle(), MockSegments::new(SegmentBehavior::Produce));
    let events = collect(f.helper.trim(TranscodeOptions::new(&f.source, "copy").with_duration(8))).await;
    assert!(!terminal(&events).is_error());

    let EncodeJob::Command { args, .. } = &f.cli.jobs()[0] else {
        panic!("expected a command job");
    };
    assert!(args.windows(2).any(|w| w == ["-c:v", "copy"]));
    assert!(args.windows(2).any(|w| w == ["-t", "8"]));
    assert!(f.segments.windows.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_thumbnail_scales_to_bound() {
    let f = fixture(Ok(thirty_second_clip()), succeeding(vec![]), idle(), MockSegments::new(SegmentBehavior::Produce));
    let options = TranscodeOptions::new(&f.source, "poster")
        .with_dimension(320, 0)
        .with_thumbnail_time(3);
    let events = collect(f.helper.thumbnail(options)).await;

    assert_eq!(
        terminal(&events),
        TerminalOutcome::Completed {
            output_path: f.output_dir.join("poster.jpg")
        }
    );
    let EncodeJob::Command { args, .. } = &f.cli.jobs()[0] else {
        panic!("expected a command job");
    };
    assert_eq!(&args[..2], ["-ss", "3"]);
    assert!(args.windows(2).any(|w| w == ["-vf", "scale=320:-2"]));
    assert_eq!(f.probe.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_info_probes_existing_files_only() {
    let f = fixture(Ok(thirty_second_clip()), idle(), idle(), MockSegments::new(SegmentBehavior::Produce));

    let info = f.helper.info(&f.source).await.unwrap();
    assert_eq!(info.orientation, Orientation::Landscape);

    let missing = f.helper.info(Path::new("/nonexistent/clip.mp4")).await.unwrap_err();
    assert!(matches!(missing, DomainError::Probe(_)));
    assert_eq!(f.probe.calls.load(Ordering::SeqCst), 1);
}

// Binary

#[test]
fn test_binary_help_lists_commands() {
    Command::cargo_bin("videohelper")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("transcode").and(predicate::str::contains("thumbnail")));
}

#[test]
fn test_binary_rejects_unknown_strategy() {
    Command::cargo_bin("videohelper")
        .unwrap()
        .args(["--strategy", "gpu", "info", "-i", "a.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown strategy"));
}
