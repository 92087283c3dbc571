//! Command implementations

use std::io::Write;

use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::adapters::TomlConfigAdapter;
use crate::app::VideoHelper;
use crate::cli::args::{InfoArgs, SourceArgs, ThumbnailArgs, TranscodeArgs, TrimArgs};
use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::domain::model::*;
use crate::ports::ConfigPort;
use crate::utils::{PathUtils, TimeParser};

/// Layered configuration with the command-line flags on top
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = TomlConfigAdapter::new()
        .load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;
    apply_cli_overrides(cli, &mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn apply_cli_overrides(cli: &Cli, config: &mut AppConfig) {
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(ffmpeg) = &cli.ffmpeg {
        config.ffmpeg_path = ffmpeg.clone();
    }
    if let Some(ffprobe) = &cli.ffprobe {
        config.ffprobe_path = ffprobe.clone();
    }
    if let Some(workers) = cli.workers {
        config.max_workers = workers;
    }
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
}

/// Execute one subcommand against a helper built from `config`
pub async fn run(command: Commands, config: AppConfig) -> Result<()> {
    let helper = VideoHelper::new(config).context("Failed to initialize media backends")?;
    match command {
        Commands::Transcode(args) => transcode(&helper, args).await,
        Commands::Trim(args) => trim(&helper, args).await,
        Commands::Thumbnail(args) => thumbnail(&helper, args).await,
        Commands::Info(args) => inspect(&helper, args).await,
    }
}

fn base_options(source: &SourceArgs, strategy: EncodeStrategy) -> Result<TranscodeOptions> {
    let paths = PathUtils::new();
    let source_path = paths
        .preprocess_video_path(&source.input)
        .with_context(|| format!("Invalid input '{}'", source.input))?;
    let name = source
        .name
        .clone()
        .unwrap_or_else(|| paths.default_base_name());
    Ok(TranscodeOptions::new(source_path, name).with_strategy(strategy))
}

/// Execute the transcode command
pub async fn transcode(helper: &VideoHelper, args: TranscodeArgs) -> Result<()> {
    let options = base_options(&args.source, helper.config().strategy)?
        .with_dimension(args.bound.width, args.bound.height)
        .with_video_bitrate_kbps(args.bitrate)
        .with_audio(
            AudioSetting::from_raw(args.audio_bitrate),
            AudioSetting::from_raw(args.audio_channels),
        )
        .with_duration(args.duration);

    info!(source = %options.source().display(), strategy = %options.strategy, "Starting transcode");
    emit_responses(helper.transcode(options)).await
}

/// Execute the trim command
pub async fn trim(helper: &VideoHelper, args: TrimArgs) -> Result<()> {
    let options =
        base_options(&args.source, helper.config().strategy)?.with_duration(args.duration);

    info!(source = %options.source().display(), duration = args.duration, "Starting trim");
    emit_responses(helper.trim(options)).await
}

/// Execute the thumbnail command
pub async fn thumbnail(helper: &VideoHelper, args: ThumbnailArgs) -> Result<()> {
    let options = base_options(&args.source, helper.config().strategy)?
        .with_dimension(args.bound.width, args.bound.height)
        .with_thumbnail_time(args.at);

    info!(
        source = %options.source().display(),
        at = %TimeParser::new().format_time(args.at as f64),
        "Starting thumbnail"
    );
    emit_responses(helper.thumbnail(options)).await
}

/// Execute the info command
pub async fn inspect(helper: &VideoHelper, args: InfoArgs) -> Result<()> {
    let path = PathUtils::new()
        .preprocess_video_path(&args.input)
        .with_context(|| format!("Invalid input '{}'", args.input))?;
    let media = helper.info(&path).await?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&media)
    } else {
        serde_json::to_string(&media)
    }
    .context("Failed to serialize media info to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Print one JSON response per event; an error response fails the command
async fn emit_responses(mut events: UnboundedReceiver<OperationEvent>) -> Result<()> {
    let stdout = std::io::stdout();
    while let Some(event) = events.recv().await {
        let response = TranscodeResponse::from(&event);
        {
            let mut out = stdout.lock();
            serde_json::to_writer(&mut out, &response).context("Failed to write response")?;
            writeln!(out).context("Failed to write response")?;
        }
        if !response.keep_callback() {
            if response.error {
                let message = response.message.unwrap_or_else(|| "Operation failed".to_string());
                return Err(anyhow!(message));
            }
            return Ok(());
        }
    }
    Err(anyhow!("Operation ended without a result"))
}
