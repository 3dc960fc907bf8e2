//! CLI error type.

use frameforge::compute::ComputeError;
use frameforge::config::ConfigFileError;
use frameforge::lod::LodConfigError;
use frameforge::logging::LoggingError;
use frameforge::quality::QualityConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigFileError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error("invalid LOD settings: {0}")]
    Lod(#[from] LodConfigError),

    #[error("invalid quality settings: {0}")]
    Quality(#[from] QualityConfigError),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to set signal handler: {0}")]
    Signal(String),
}
