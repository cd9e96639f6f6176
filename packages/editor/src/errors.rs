//! Error types for the editor

use crate::mutations::MutationError;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification shared by every editor error.
///
/// Callers translate kinds into their own presentation (exit codes,
/// response envelopes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Overlap,
    Conflict,
    ValidationFailed,
    Other,
}

impl ErrorKind {
    /// Stable code string
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::Overlap => "OVERLAP",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::ValidationFailed => "VALIDATION_FAILED",
            ErrorKind::Other => "ERROR",
        }
    }
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Document error: {0}")]
    Document(#[from] splice_document::DocumentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Mutation(#[from] MutationError),

    #[error("Project file not found: {}", .0.display())]
    ProjectNotFound(PathBuf),

    #[error("Invalid project: {0}")]
    InvalidProject(String),

    #[error("Target already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("No snapshots available for undo")]
    NoSnapshots,

    #[error("No redo entries available")]
    NoRedoEntries,

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Project validation failed: {0}")]
    ValidationFailed(String),
}

impl EditorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EditorError::Mutation(e) => e.kind(),
            EditorError::ProjectNotFound(_) | EditorError::SnapshotNotFound(_) => ErrorKind::NotFound,
            EditorError::Document(_)
            | EditorError::InvalidProject(_)
            | EditorError::AlreadyExists(_)
            | EditorError::NoSnapshots
            | EditorError::NoRedoEntries
            | EditorError::NoActiveTransaction => ErrorKind::InvalidInput,
            EditorError::ValidationFailed(_) => ErrorKind::ValidationFailed,
            EditorError::Io(_) | EditorError::Serialization(_) => ErrorKind::Other,
        }
    }

    /// Stable code string (`NOT_FOUND`, `INVALID_INPUT`, ...)
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_kinds() {
        let err = EditorError::from(MutationError::ClipNotFound("clip_x".into()));
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(EditorError::NoRedoEntries.code(), "INVALID_INPUT");
        assert_eq!(EditorError::ValidationFailed("x".into()).code(), "VALIDATION_FAILED");

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(EditorError::from(io).code(), "ERROR");
    }

    #[test]
    fn test_undo_redo_messages() {
        assert_eq!(EditorError::NoRedoEntries.to_string(), "No redo entries available");
        assert_eq!(EditorError::NoSnapshots.to_string(), "No snapshots available for undo");
    }
}
