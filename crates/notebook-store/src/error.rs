//! Store error taxonomy.
//!
//! Every failure is recoverable and request-scoped: it aborts the single
//! triggering operation, leaves in-memory state unchanged (except for
//! autosave failures, which deliberately do not roll back the applied
//! mutation), and carries a stable machine-readable code for the
//! transport layer.

use std::path::PathBuf;

use notebook_model::CommandError;
use uuid::Uuid;

/// Failures raised by [`NotebookStore`](crate::store::NotebookStore)
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Notebook not found with uuid: {0}")]
    NotebookNotFound(Uuid),

    /// Cell-level failures (not found, no merge neighbor, empty history).
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("File already exists: {0}")]
    FileAlreadyExists(PathBuf),

    #[error("Failed to parse notebook: {0}")]
    InvalidNotebook(String),

    /// A disk write failed after the in-memory mutation was committed.
    /// The document in memory stays authoritative; disk is a cache.
    #[error("Failed to write notebook to {path}: {source}")]
    Autosave {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Stable machine-readable code for the REST layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::NotebookNotFound(_) => "NOTEBOOK_NOT_FOUND",
            StoreError::Command(err) => err.error_code(),
            StoreError::FileNotFound(_) => "FILE_NOT_FOUND",
            StoreError::DirectoryNotFound(_) => "DIRECTORY_NOT_FOUND",
            StoreError::FileAlreadyExists(_) => "FILE_ALREADY_EXISTS",
            StoreError::InvalidNotebook(_) => "INVALID_NOTEBOOK",
            StoreError::Autosave { .. } => "AUTOSAVE_FAILED",
            StoreError::Io(_) => "IO_ERROR",
        }
    }
}

impl From<notebook_model::format::ReadError> for StoreError {
    fn from(err: notebook_model::format::ReadError) -> Self {
        StoreError::InvalidNotebook(err.to_string())
    }
}
