use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlueError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Cannot read {}: {source}", path.display())]
    SourceUnreadable {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot write {}: {source}", path.display())]
    DestinationWrite {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid container: {0}")]
    InvalidContainer(String),
}

/// Failure of a merge.
pub type MergeError = GlueError;
/// Failure of a split.
pub type SplitError = GlueError;

pub type Result<T, E = GlueError> = std::result::Result<T, E>;

impl GlueError {
    /// Classify a failed open of an input path.
    pub(crate) fn open_source(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => GlueError::SourceNotFound(path),
            _ => GlueError::SourceUnreadable { path, source: err },
        }
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        GlueError::SourceUnreadable { path: path.into(), source }
    }

    pub(crate) fn unwritable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        GlueError::DestinationWrite { path: path.into(), source }
    }
}
