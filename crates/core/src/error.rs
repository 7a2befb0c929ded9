use std::io;
use std::path::PathBuf;

/// Errors that can occur while preparing and running protoc
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Filesystem error at {}: {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} was not a readable artifact: {reason}", .path.display())]
    InvalidArchive { path: PathBuf, reason: String },

    #[error("Invalid glob pattern {pattern:?}: {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to launch {executable}: {source}")]
    LaunchError {
        executable: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "protoc did not exit cleanly (exit code {}). Review output for more information.\nprotoc output: {stdout}\nprotoc error: {stderr}",
        .exit_code.map_or_else(|| "none".to_string(), |c| c.to_string())
    )]
    CompilerFailed {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl Error {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::FileSystem {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure came from the compiler's diagnostics rather than the environment
    pub fn is_compilation_failure(&self) -> bool {
        matches!(self, Error::CompilerFailed { .. })
    }
}

/// Result type alias for protoc-runner operations
pub type Result<T> = std::result::Result<T, Error>;
