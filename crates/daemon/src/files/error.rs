//! Errors raised by the exploration engine.

use std::io;
use std::path::{Path, PathBuf};

use remofs_protocol::ErrorCode;
use thiserror::Error;

/// Errors that can occur while validating or listing paths.
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// The path is empty or malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The path does not exist.
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),

    /// The daemon lacks permission to access the path.
    #[error("permission denied: {0}")]
    AccessDenied(PathBuf),

    /// The path lies outside the permitted root.
    #[error("path is outside the permitted root: {0}")]
    Forbidden(PathBuf),

    /// The path is not a directory.
    #[error("path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ExplorerError {
    /// Classify an IO error raised while accessing `path`.
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ExplorerError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => ExplorerError::AccessDenied(path.to_path_buf()),
            io::ErrorKind::NotADirectory => ExplorerError::NotADirectory(path.to_path_buf()),
            _ => ExplorerError::Io(err),
        }
    }

    /// The protocol error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ExplorerError::InvalidPath(_) => ErrorCode::InvalidPath,
            ExplorerError::NotFound(_) => ErrorCode::NotFound,
            ExplorerError::AccessDenied(_) => ErrorCode::AccessDenied,
            ExplorerError::Forbidden(_) => ErrorCode::Forbidden,
            ExplorerError::NotADirectory(_) => ErrorCode::NotADirectory,
            ExplorerError::Io(_) => ErrorCode::Internal,
        }
    }
}
