use crate::app::models::Platform;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures that abort option normalization. No partial result is ever produced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to read config at {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid ignore pattern: {pattern}")]
    IgnorePattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to inspect {platform} project at {path}")]
    WorkflowProbe {
        platform: Platform,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build probe thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Fingerprint run was cancelled")]
    Cancelled,
}
