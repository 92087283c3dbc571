use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error};

use crate::adapters::{FFprobeAdapter, FfmpegCliEncoder, LibavNativeEncoder, LibavRemuxBackend};
use crate::app::{
    InspectInteractor, ThumbnailInteractor, TranscodeInteractor, TrimInteractor, WorkerPool,
};
use crate::config::AppConfig;
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::engine::{ProgressGate, TrackDemuxRemuxer};
use crate::ports::{EncoderPort, ProbePort, SegmentPort};

/// Ports one `VideoHelper` is assembled from
pub struct HelperPorts {
    pub probe: Arc<dyn ProbePort>,
    pub cli_encoder: Arc<dyn EncoderPort>,
    pub native_encoder: Arc<dyn EncoderPort>,
    pub segments: Arc<dyn SegmentPort>,
}

impl HelperPorts {
    /// Production adapters: ffprobe, the ffmpeg binary and libav
    pub fn from_config(config: &AppConfig) -> Result<Self, DomainError> {
        Ok(Self {
            probe: Arc::new(FFprobeAdapter::new(config.ffprobe_path.clone())),
            cli_encoder: Arc::new(FfmpegCliEncoder::new(config.ffmpeg_path.clone())),
            native_encoder: Arc::new(LibavNativeEncoder::new()?),
            segments: Arc::new(TrackDemuxRemuxer::new(LibavRemuxBackend::new()?)),
        })
    }
}

/// Entry point for every operation; each call returns its own event stream
pub struct VideoHelper {
    config: AppConfig,
    pool: WorkerPool,
    transcode_interactor: Arc<TranscodeInteractor>,
    trim_interactor: Arc<TrimInteractor>,
    thumbnail_interactor: Arc<ThumbnailInteractor>,
    inspect_interactor: Arc<InspectInteractor>,
}

impl VideoHelper {
    /// Helper wired to the production adapters
    pub fn new(config: AppConfig) -> Result<Self, DomainError> {
        let ports = HelperPorts::from_config(&config)?;
        Ok(Self::with_ports(config, ports))
    }

    pub fn with_ports(config: AppConfig, ports: HelperPorts) -> Self {
        let output_dir = config.output_dir.clone();

        let transcode_interactor = Arc::new(TranscodeInteractor::new(
            Arc::clone(&ports.probe),
            Arc::clone(&ports.cli_encoder),
            Arc::clone(&ports.native_encoder),
            Arc::clone(&ports.segments),
            output_dir.clone(),
        ));
        let trim_interactor = Arc::new(TrimInteractor::new(
            Arc::clone(&ports.probe),
            Arc::clone(&ports.cli_encoder),
            Arc::clone(&ports.segments),
            output_dir.clone(),
        ));
        let thumbnail_interactor = Arc::new(ThumbnailInteractor::new(
            Arc::clone(&ports.cli_encoder),
            output_dir,
        ));
        let inspect_interactor = Arc::new(InspectInteractor::new(Arc::clone(&ports.probe)));

        Self {
            pool: WorkerPool::new(config.worker_count()),
            config,
            transcode_interactor,
            trim_interactor,
            thumbnail_interactor,
            inspect_interactor,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Transcode to `<base>.mp4`; progress events then exactly one terminal event
    pub fn transcode(&self, options: TranscodeOptions) -> UnboundedReceiver<OperationEvent> {
        let interactor = Arc::clone(&self.transcode_interactor);
        self.submit("transcode", move |gate| interactor.execute(&options, gate))
    }

    /// Lossless trim to `trimmed-<base>.mp4`
    pub fn trim(&self, options: TranscodeOptions) -> UnboundedReceiver<OperationEvent> {
        let interactor = Arc::clone(&self.trim_interactor);
        self.submit("trim", move |gate| interactor.execute(&options, gate))
    }

    /// Frame capture to `<base>.jpg`
    pub fn thumbnail(&self, options: TranscodeOptions) -> UnboundedReceiver<OperationEvent> {
        let interactor = Arc::clone(&self.thumbnail_interactor);
        self.submit("thumbnail", move |gate| interactor.execute(&options, gate))
    }

    /// Probe metadata, holding a worker slot while it runs
    pub async fn info(&self, path: &Path) -> Result<MediaInfo, DomainError> {
        let _permit = self.pool.acquire().await?;
        self.inspect_interactor.execute(path).await
    }

    fn submit<F>(&self, operation: &'static str, job: F) -> UnboundedReceiver<OperationEvent>
    where
        F: FnOnce(&ProgressGate) + Send + 'static,
    {
        let (sink, stream) = mpsc::unbounded_channel();
        let gate = Arc::new(ProgressGate::new(sink));

        let worker_gate = Arc::clone(&gate);
        let abort_gate = Arc::clone(&gate);
        let submitted = self.pool.spawn(
            move || job(&worker_gate),
            move |reason| {
                abort_gate.finish(TerminalOutcome::failed(reason));
            },
        );

        match submitted {
            Ok(()) => debug!(operation, "Operation queued"),
            Err(err) => {
                error!(operation, error = %err, "Operation could not be queued");
                gate.finish(TerminalOutcome::from(err));
            }
        }
        stream
    }
}
