// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod exec_libav;
pub mod probe_ffprobe;
pub mod remux_libav;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::FfmpegCliEncoder;
pub use exec_libav::LibavNativeEncoder;
pub use probe_ffprobe::FFprobeAdapter;
pub use remux_libav::LibavRemuxBackend;
pub use toml_config::TomlConfigAdapter;
pub use tracing_log::init_logging;
