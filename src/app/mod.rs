// Application layer - Use case interactors

pub mod container;
pub mod inspect_interactor;
pub mod session;
pub mod thumbnail_interactor;
pub mod transcode_interactor;
pub mod trim_interactor;
pub mod worker_pool;

// Re-export interactors
pub use container::{HelperPorts, VideoHelper};
pub use inspect_interactor::InspectInteractor;
pub use thumbnail_interactor::ThumbnailInteractor;
pub use transcode_interactor::TranscodeInteractor;
pub use trim_interactor::TrimInteractor;
pub use worker_pool::WorkerPool;
