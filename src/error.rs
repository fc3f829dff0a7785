use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Custom error type for strmsync
///
/// Only conditions that make a run meaningless are represented here. Probe
/// failures and per-file filesystem failures are downgraded to verdicts and
/// report entries instead.
#[derive(Error, Debug)]
pub enum StrmError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Target root {path} is not accessible: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for strmsync
pub type Result<T> = std::result::Result<T, StrmError>;

impl StrmError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        StrmError::Config(msg.into())
    }

    /// Create a manifest read error
    pub fn manifest<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        StrmError::Manifest {
            path: path.into(),
            source,
        }
    }

    /// Create a target root error
    pub fn root<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        StrmError::Root {
            path: path.into(),
            source,
        }
    }

    /// Whether the error aborts a run before reconciliation can start
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StrmError::Config(_) | StrmError::Manifest { .. } | StrmError::Root { .. }
        )
    }
}
