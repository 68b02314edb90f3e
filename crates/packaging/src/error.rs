//! Error types for plugin packaging

use std::path::PathBuf;
use thiserror::Error;

/// Errors from building, translating or deploying the plugin
#[derive(Error, Debug)]
pub enum PackagingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("No 'version=' line in {}", path.display())]
    MissingVersion { path: PathBuf },

    #[error("External tool not found: {program}")]
    ToolNotFound { program: String },

    #[error("{program} failed (exit code {code:?})")]
    ToolFailed { program: String, code: Option<i32> },

    #[error("Deploy target {} already exists and is not a link to the plugin", path.display())]
    DeployConflict { path: PathBuf },

    #[error("HOME is not set")]
    MissingHome,

    #[error("Unknown target '{0}'")]
    UnknownTarget(String),
}

/// Result type alias for packaging operations
pub type Result<T> = std::result::Result<T, PackagingError>;
