//! Error types for the nanoasm library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for nanoasm operations.
pub type Result<T> = std::result::Result<T, NanoAsmError>;

/// Errors that can occur outside of stage execution.
#[derive(Error, Debug)]
pub enum NanoAsmError {
    /// Input directory not found
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Basecaller version string could not be parsed
    #[error("Invalid basecaller version '{0}'")]
    InvalidVersion(String),

    /// Model name does not follow the cell/device/variant/version layout
    #[error("Unrecognised model name '{0}'")]
    InvalidModelName(String),

    /// A pipeline stage failed
    #[error(transparent)]
    Stage(#[from] StageError),
}

/// Failure of a single stage against a single working directory.
///
/// Raised by work stages this aborts the directory and triggers cleanup.
/// Raised by cleanup stages it is recorded and swallowed.
#[derive(Error, Debug)]
pub enum StageError {
    /// The external tool exited with a non-zero status
    #[error("{tool} exited with status {code}: {stderr_tail}")]
    ToolFailed {
        tool: String,
        code: i32,
        stderr_tail: String,
    },

    /// The external tool could not be started
    #[error("Failed to launch {tool}: {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// An artifact the stage depends on is absent
    #[error("{stage}: required artifact {path} is missing")]
    MissingArtifact { stage: String, path: PathBuf },

    /// A location the stage must create is already occupied
    #[error("Output location {0} already exists")]
    ArtifactExists(PathBuf),

    /// Filesystem operation failed inside the stage
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Tool produced output the stage could not interpret
    #[error("{0}")]
    InvalidOutput(String),
}

impl StageError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StageError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn missing(stage: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        StageError::MissingArtifact {
            stage: stage.into(),
            path: path.into(),
        }
    }
}

/// Keep only the last few lines of a tool's stderr for error messages.
pub(crate) fn stderr_tail(stderr: &[u8]) -> String {
    const TAIL_LINES: usize = 5;
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(TAIL_LINES);
    lines[start..].join("\n")
}
